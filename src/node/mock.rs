//! In-memory daemon used by unit tests.

use super::client::NodeRpc;
use super::types::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Mock node serving a linear chain and a transaction index from memory.
#[derive(Default)]
pub struct MockNode {
	state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
	blocks: Vec<Block>,
	transactions: HashMap<String, RawTransaction>,
	mempool: Vec<String>,
	valid_addresses: HashSet<String>,
	failing_txids: HashSet<String>,
	offline: bool,
	calls: HashMap<&'static str, usize>,
}

impl MockNode {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a block at the next height holding `txids`. Returns its hash.
	///
	/// A coinbase transaction is prepended, as every real block carries one.
	pub fn push_block(&self, txids: &[&str]) -> String {
		let mut state = self.state.lock().unwrap();
		let height = state.blocks.len() as u64;
		let hash = block_hash(height);
		let coinbase = format!("coinbase-{height}");
		state.transactions.insert(
			coinbase.clone(),
			RawTransaction {
				txid: coinbase.clone(),
				vin: vec![TxInput {
					txid: None,
					vout: None,
					coinbase: Some("03".to_string()),
				}],
				vout: vec![output(1.0, "sMiner")],
			},
		);
		let mut tx = vec![coinbase];
		tx.extend(txids.iter().map(|t| t.to_string()));
		if let Some(previous) = state.blocks.last_mut() {
			previous.next_block_hash = Some(hash.clone());
		}
		state.blocks.push(Block {
			hash: hash.clone(),
			height,
			time: 1_600_000_000 + height as i64 * 60,
			n_tx: tx.len(),
			tx,
			next_block_hash: None,
		});
		hash
	}

	/// Append empty blocks until the chain tip is at `height`.
	pub fn extend_to(&self, height: u64) {
		while self.tip_height().map(|h| h < height).unwrap_or(true) {
			self.push_block(&[]);
		}
	}

	pub fn tip_height(&self) -> Option<u64> {
		self.state.lock().unwrap().blocks.last().map(|b| b.height)
	}

	pub fn insert_transaction(&self, tx: RawTransaction) {
		self.state
			.lock()
			.unwrap()
			.transactions
			.insert(tx.txid.clone(), tx);
	}

	pub fn add_to_mempool(&self, txid: &str) {
		self.state.lock().unwrap().mempool.push(txid.to_string());
	}

	pub fn add_valid_address(&self, address: &str) {
		self.state
			.lock()
			.unwrap()
			.valid_addresses
			.insert(address.to_string());
	}

	/// Make `getrawtransaction` fail for `txid`.
	pub fn fail_transaction(&self, txid: &str) {
		self.state
			.lock()
			.unwrap()
			.failing_txids
			.insert(txid.to_string());
	}

	pub fn set_offline(&self, offline: bool) {
		self.state.lock().unwrap().offline = offline;
	}

	pub fn calls(&self, method: &str) -> usize {
		self.state
			.lock()
			.unwrap()
			.calls
			.get(method)
			.copied()
			.unwrap_or(0)
	}

	fn record(&self, method: &'static str) -> Result<std::sync::MutexGuard<'_, MockState>, RpcError> {
		let mut state = self.state.lock().unwrap();
		*state.calls.entry(method).or_default() += 1;
		if state.offline {
			return Err(RpcError::Status(503));
		}
		Ok(state)
	}
}

pub fn block_hash(height: u64) -> String {
	format!("{height:064x}")
}

fn not_found() -> RpcError {
	RpcError::Rpc {
		code: -5,
		message: "No such mempool or blockchain transaction".to_string(),
	}
}

/// A standard output paying `address`.
pub fn output(value: f64, address: &str) -> TxOutput {
	TxOutput {
		value,
		n: 0,
		script_pub_key: ScriptPubKey {
			asm: "OP_DUP OP_HASH160 00 OP_EQUALVERIFY OP_CHECKSIG".to_string(),
			addresses: vec![address.to_string()],
			..Default::default()
		},
	}
}

/// A data-carrier output holding `message`.
pub fn data_output(message: &str) -> TxOutput {
	TxOutput {
		value: 0.00000001,
		n: 0,
		script_pub_key: ScriptPubKey {
			asm: format!("OP_RETURN {}", hex::encode(message)),
			script_type: Some("nulldata".to_string()),
			..Default::default()
		},
	}
}

pub fn input(txid: &str, vout: u32) -> TxInput {
	TxInput {
		txid: Some(txid.to_string()),
		vout: Some(vout),
		coinbase: None,
	}
}

/// A transaction with `outputs`, whose outputs are renumbered in order.
pub fn transaction(txid: &str, vin: Vec<TxInput>, outputs: Vec<TxOutput>) -> RawTransaction {
	let vout = outputs
		.into_iter()
		.enumerate()
		.map(|(n, mut output)| {
			output.n = n as u32;
			output
		})
		.collect();
	RawTransaction {
		txid: txid.to_string(),
		vin,
		vout,
	}
}

/// Store a funding transaction paying `address` and return an input spending it.
pub fn fund(node: &MockNode, funding_txid: &str, address: &str) -> TxInput {
	node.insert_transaction(transaction(
		funding_txid,
		vec![],
		vec![output(5.0, address)],
	));
	input(funding_txid, 0)
}

#[async_trait]
impl NodeRpc for MockNode {
	async fn get_best_block_hash(&self) -> Result<String, RpcError> {
		let state = self.record("getbestblockhash")?;
		state
			.blocks
			.last()
			.map(|b| b.hash.clone())
			.ok_or_else(|| RpcError::MissingResult("getbestblockhash".to_string()))
	}

	async fn get_block(&self, hash: &str) -> Result<Block, RpcError> {
		let state = self.record("getblock")?;
		state
			.blocks
			.iter()
			.find(|b| b.hash == hash)
			.cloned()
			.ok_or(RpcError::Rpc {
				code: -5,
				message: "Block not found".to_string(),
			})
	}

	async fn get_block_hash(&self, height: u64) -> Result<String, RpcError> {
		let state = self.record("getblockhash")?;
		state
			.blocks
			.get(height as usize)
			.map(|b| b.hash.clone())
			.ok_or(RpcError::Rpc {
				code: -8,
				message: "Block height out of range".to_string(),
			})
	}

	async fn get_block_count(&self) -> Result<u64, RpcError> {
		let state = self.record("getblockcount")?;
		Ok(state.blocks.len().saturating_sub(1) as u64)
	}

	async fn get_raw_transaction(&self, txid: &str) -> Result<RawTransaction, RpcError> {
		let state = self.record("getrawtransaction")?;
		if state.failing_txids.contains(txid) {
			return Err(RpcError::Status(500));
		}
		state.transactions.get(txid).cloned().ok_or_else(not_found)
	}

	async fn validate_address(&self, address: &str) -> Result<bool, RpcError> {
		let state = self.record("validateaddress")?;
		Ok(state.valid_addresses.contains(address))
	}

	async fn get_raw_mempool(&self) -> Result<Vec<String>, RpcError> {
		let state = self.record("getrawmempool")?;
		Ok(state.mempool.clone())
	}

	async fn uptime(&self) -> Result<u64, RpcError> {
		self.record("uptime")?;
		Ok(42)
	}
}
