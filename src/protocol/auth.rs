//! Caller authentication by input ownership.
//!
//! Overlay messages are not signed. Instead, every input of the calling transaction must
//! spend an output paying the claimed address, which proves the author controls that
//! address's keys.

use super::types::ProtocolError;
use crate::node::{NodeRpc, RawTransaction};
use tracing::debug;

/// Check that every input of `tx` spends an output paying `claimed`.
///
/// Stops at the first mismatching input. A transaction without inputs proves nothing and
/// fails; only coinbase transactions lack them on chain.
pub async fn authenticate(
	node: &dyn NodeRpc,
	tx: &RawTransaction,
	claimed: &str,
) -> Result<(), ProtocolError> {
	if tx.vin.is_empty() {
		return Err(ProtocolError::AuthenticationFailed {
			claimed: claimed.to_string(),
			input: "<none>".to_string(),
		});
	}

	for (index, input) in tx.vin.iter().enumerate() {
		let (Some(prev_txid), Some(prev_vout)) = (input.txid.as_deref(), input.vout) else {
			return Err(ProtocolError::AuthenticationFailed {
				claimed: claimed.to_string(),
				input: format!("#{} (coinbase)", index),
			});
		};

		let prev_tx = node.get_raw_transaction(prev_txid).await?;
		let prev_output = prev_tx.vout.get(prev_vout as usize).ok_or_else(|| {
			ProtocolError::MalformedTransaction(format!(
				"input {}:{} references a missing output",
				prev_txid, prev_vout
			))
		})?;

		if prev_output.script_pub_key.first_address() != Some(claimed) {
			return Err(ProtocolError::AuthenticationFailed {
				claimed: claimed.to_string(),
				input: format!("{}:{}", prev_txid, prev_vout),
			});
		}
		debug!("Input {}:{} belongs to {}", prev_txid, prev_vout, claimed);
	}

	Ok(())
}
