//! Positional output conventions of the protocol.
//!
//! Wallets build protocol transactions with a fixed output layout, and the protocol reads
//! identities from it:
//! - output 1 pays the deployment fee on `SCPCREATE`, and is the caller's change on contract calls
//! - the last output is the creator's change on `SCPCREATE`
//!
//! NOTE: a hand-built transaction can place other outputs in these positions. The positions
//! are kept exactly as deployed ledgers interpret them; inputs are authenticated separately.

use crate::config::ProtocolParams;
use crate::node::RawTransaction;

/// Output index holding the fee (creates) or the caller's change (contract calls)
pub const CALLER_OUTPUT_INDEX: usize = 1;

/// Address of the party calling a contract: the address paid by output 1.
pub fn caller_address_of(tx: &RawTransaction) -> Option<&str> {
	tx.output_address(CALLER_OUTPUT_INDEX)
}

/// Address of a token's creator: the address paid by the last output.
pub fn creator_address_of(tx: &RawTransaction) -> Option<&str> {
	tx.vout
		.len()
		.checked_sub(1)
		.and_then(|last| tx.output_address(last))
}

/// Whether output 1 pays at least the deployment fee to the fee address.
pub fn pays_deploy_fee(tx: &RawTransaction, params: &ProtocolParams) -> bool {
	tx.vout.get(CALLER_OUTPUT_INDEX).is_some_and(|output| {
		output.script_pub_key.first_address() == Some(params.deploy_fee_address.as_str())
			&& output.value >= params.deploy_fee
	})
}
