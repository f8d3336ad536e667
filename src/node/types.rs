//! Types for the node daemon's JSON-RPC surface.

use serde::{Deserialize, Serialize};

/// A block as returned by `getblock <hash>` (verbosity 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
	/// The block hash.
	pub hash: String,
	/// Height of the block in the main chain.
	pub height: u64,
	/// Block timestamp, seconds since the epoch.
	#[serde(default)]
	pub time: i64,
	/// Transaction ids contained in the block, in block order.
	#[serde(default)]
	pub tx: Vec<String>,
	/// Number of transactions in the block.
	#[serde(rename = "nTx", default)]
	pub n_tx: usize,
	/// Hash of the next block, when the node already knows it.
	#[serde(rename = "nextblockhash", default)]
	pub next_block_hash: Option<String>,
}

impl Block {
	/// Whether the block only carries its coinbase transaction.
	pub fn is_coinbase_only(&self) -> bool {
		self.n_tx == 1
	}
}

/// A verbose transaction as returned by `getrawtransaction <txid> 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTransaction {
	pub txid: String,
	#[serde(default)]
	pub vin: Vec<TxInput>,
	#[serde(default)]
	pub vout: Vec<TxOutput>,
}

impl RawTransaction {
	/// Address paid by the output at `index`, if the output exists and pays one.
	pub fn output_address(&self, index: usize) -> Option<&str> {
		self.vout
			.get(index)
			.and_then(|output| output.script_pub_key.first_address())
	}
}

/// Reference from an input to the output it spends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxInput {
	/// Transaction holding the spent output. Absent on coinbase inputs.
	#[serde(default)]
	pub txid: Option<String>,
	/// Index of the spent output within `txid`.
	#[serde(default)]
	pub vout: Option<u32>,
	#[serde(default)]
	pub coinbase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxOutput {
	/// Output value in coins.
	pub value: f64,
	#[serde(default)]
	pub n: u32,
	#[serde(rename = "scriptPubKey")]
	pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptPubKey {
	/// Disassembled script, e.g. `OP_RETURN 5343...`.
	#[serde(default)]
	pub asm: String,
	#[serde(default)]
	pub hex: Option<String>,
	#[serde(rename = "type", default)]
	pub script_type: Option<String>,
	/// Legacy address list.
	#[serde(default)]
	pub addresses: Vec<String>,
	/// Single-address field reported by newer daemons.
	#[serde(default)]
	pub address: Option<String>,
}

impl ScriptPubKey {
	/// The first address this script pays to.
	pub fn first_address(&self) -> Option<&str> {
		self.addresses
			.first()
			.map(String::as_str)
			.or(self.address.as_deref())
			.filter(|address| !address.is_empty())
	}
}

/// Response of `validateaddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressValidation {
	#[serde(rename = "isvalid")]
	pub is_valid: bool,
}

/// JSON-RPC error object returned by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcEnvelope {
	#[serde(default)]
	pub result: serde_json::Value,
	#[serde(default)]
	pub error: Option<RpcErrorObject>,
	#[serde(default)]
	pub id: serde_json::Value,
}

/// Error types for node RPC calls
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("HTTP status {0}")]
	Status(u16),

	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("No result returned for {0}")]
	MissingResult(String),
}
