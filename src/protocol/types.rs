use crate::ledger::LedgerError;
use crate::node::RpcError;

/// Result of applying one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// The message is not addressed to the protocol.
	Ignored,
	Created { contract: String, version: u8 },
	Minted { amount: u64 },
	Burned { amount: u64 },
	Sent { amount: u64, receiver: String },
	Redeemed { amount: u64 },
	/// A contract call whose method the token does not support.
	NotDispatched,
}

/// Error types for protocol message processing.
///
/// Rejections are terminal outcomes for a well-formed message that broke a rule. Faults mean
/// the message could not be judged at all.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
	#[error("Parse rejected: {0}")]
	ParseRejected(String),

	#[error("Validation rejected: {0}")]
	ValidationRejected(String),

	#[error("Authentication failed: input {input} is not owned by {claimed}")]
	AuthenticationFailed { claimed: String, input: String },

	#[error("Contract write attempted on a non-existent contract {0}")]
	UnknownToken(String),

	#[error("RPC fault: {0}")]
	Rpc(#[from] RpcError),

	#[error("Malformed transaction: {0}")]
	MalformedTransaction(String),
}

impl ProtocolError {
	pub fn is_rejection(&self) -> bool {
		!matches!(
			self,
			ProtocolError::Rpc(_) | ProtocolError::MalformedTransaction(_)
		)
	}
}

impl From<LedgerError> for ProtocolError {
	fn from(e: LedgerError) -> Self {
		ProtocolError::ValidationRejected(e.to_string())
	}
}
