//! Extraction of protocol messages from data-carrier outputs.

use crate::node::{RawTransaction, TxOutput};
use tracing::error;

const DATA_CARRIER_OPCODE: &str = "OP_RETURN";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("Data-carrier payload is not valid hex: {0}")]
	InvalidHex(#[from] hex::FromHexError),
}

/// Whether `output` is an unspendable data-only script.
pub fn is_data_carrier(output: &TxOutput) -> bool {
	output.script_pub_key.asm.starts_with(DATA_CARRIER_OPCODE)
}

/// Decode the message carried by the first data-carrier output of `tx`.
///
/// Later data-carrier outputs are ignored. Returns `Ok(None)` when the transaction has no
/// data-carrier output or the first one carries no payload. Byte sequences that are not
/// UTF-8 are replaced with U+FFFD rather than rejected.
pub fn extract_message(tx: &RawTransaction) -> Result<Option<String>, DecodeError> {
	let Some(carrier) = tx.vout.iter().find(|output| is_data_carrier(output)) else {
		return Ok(None);
	};

	let payload = carrier.script_pub_key.asm[DATA_CARRIER_OPCODE.len()..].trim_start();
	if payload.is_empty() {
		return Ok(None);
	}

	let bytes = hex::decode(payload).map_err(|e| {
		error!("[EXTRACT_MESSAGE] Failed to decode hex in {}: {}", tx.txid, e);
		e
	})?;

	Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
