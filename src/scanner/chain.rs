//! Sequential block-range scanner.
//!
//! Blocks are applied in ascending height order and transactions in block order, so later
//! activity for an account always lands after earlier activity. A fault in one transaction
//! is logged and skipped; only failures to resolve or fetch a block abort the scan.

use super::cursor::ScanCursor;
use super::messages::{ScannedMessage, SharedMessageLog};
use crate::extractor::{DecodeError, extract_message};
use crate::node::{Block, NodeRpc, RpcError};
use crate::protocol::{Outcome, ProtocolEngine, ProtocolError};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
	#[error("Block lookup failed: {0}")]
	Rpc(#[from] RpcError),
}

/// Failure to judge a single transaction.
#[derive(Debug, thiserror::Error)]
enum TransactionFault {
	#[error("fetch failed: {0}")]
	Rpc(#[from] RpcError),

	#[error("message decoding failed: {0}")]
	Decode(#[from] DecodeError),

	#[error("{0}")]
	Protocol(ProtocolError),
}

pub struct ChainScanner {
	node: Arc<dyn NodeRpc>,
	engine: ProtocolEngine,
	cursor: Mutex<ScanCursor>,
	messages: SharedMessageLog,
}

impl ChainScanner {
	pub fn new(node: Arc<dyn NodeRpc>, engine: ProtocolEngine, messages: SharedMessageLog) -> Self {
		Self {
			node,
			engine,
			cursor: Mutex::new(ScanCursor::new()),
			messages,
		}
	}

	/// Resume from a previously persisted cursor.
	pub fn with_cursor(self, cursor: ScanCursor) -> Self {
		Self {
			cursor: Mutex::new(cursor),
			..self
		}
	}

	pub fn engine(&self) -> &ProtocolEngine {
		&self.engine
	}

	pub fn messages(&self) -> &SharedMessageLog {
		&self.messages
	}

	/// A copy of the cursor as of the last completed block.
	pub async fn cursor(&self) -> ScanCursor {
		self.cursor.lock().await.clone()
	}

	/// Whether no block has been processed yet.
	pub async fn is_cold(&self) -> bool {
		self.cursor.lock().await.is_empty()
	}

	/// Height of the current best block.
	pub async fn tip_height(&self) -> Result<u64, ScanError> {
		let hash = self.node.get_best_block_hash().await?;
		Ok(self.node.get_block(&hash).await?.height)
	}

	pub async fn block_count(&self) -> Result<u64, ScanError> {
		Ok(self.node.get_block_count().await?)
	}

	/// Scan every height in `range`, returning the messages found in newly processed blocks.
	pub async fn scan_range(
		&self,
		range: RangeInclusive<u64>,
	) -> Result<Vec<ScannedMessage>, ScanError> {
		let (start, end) = (*range.start(), *range.end());
		let mut cursor = self.cursor.lock().await;
		cursor.begin_scan(start, end);
		debug!("Scanning blocks {}..={}", start, end);

		let mut found = Vec::new();
		// Hash of the next height, valid only right after fetching its predecessor
		let mut next_hash: Option<String> = None;

		for height in range {
			let hash = match next_hash.take() {
				Some(hash) => hash,
				None => self.node.get_block_hash(height).await?,
			};
			if cursor.is_processed(&hash) {
				debug!("Skipping processed block {} at height {}", hash, height);
				cursor.record_skip();
				continue;
			}

			let block = self.node.get_block(&hash).await?;
			next_hash = block.next_block_hash.clone();
			cursor.record_block(&block.hash, block.height);
			self.engine
				.ledger()
				.write()
				.await
				.set_block_height(block.height);

			if block.is_coinbase_only() {
				cursor.log_progress(block.height, false);
				continue;
			}

			for txid in &block.tx {
				match self.process_transaction(&block, txid).await {
					Ok(Some(message)) => {
						cursor.record_transaction(true);
						found.push(message);
					}
					Ok(None) => cursor.record_transaction(false),
					Err(e) => {
						error!(
							"Skipping transaction {} in block {} at height {}: {}",
							txid, block.hash, block.height, e
						);
						cursor.record_fault();
					}
				}
			}
			cursor.log_progress(block.height, false);
		}

		cursor.log_progress(end, true);
		info!("{}", cursor.stats().summary());
		Ok(found)
	}

	/// Fetch one transaction, then record and apply its message if it carries one.
	async fn process_transaction(
		&self,
		block: &Block,
		txid: &str,
	) -> Result<Option<ScannedMessage>, TransactionFault> {
		let tx = self.node.get_raw_transaction(txid).await?;
		let Some(msg) = extract_message(&tx)? else {
			return Ok(None);
		};

		let message = ScannedMessage {
			msg,
			txid: tx.txid.clone(),
			time: Some(block.time),
			height: Some(block.height),
			mempool: false,
		};
		self.messages
			.write()
			.await
			.extend_confirmed([message.clone()]);

		match self.engine.process(&message.msg, &tx, block.height).await {
			Ok(Outcome::Ignored) => debug!("Ignoring non-protocol message in {}", txid),
			Ok(outcome) => debug!("Applied message in {}: {:?}", txid, outcome),
			Err(e) if e.is_rejection() => warn!("Rejected message in {}: {}", txid, e),
			Err(e) => return Err(TransactionFault::Protocol(e)),
		}
		Ok(Some(message))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ProtocolParams;
	use crate::ledger::{ActivityType, Ledger};
	use crate::node::mock::{MockNode, data_output, fund, output, transaction};
	use crate::scanner::MessageLog;

	const CREATOR: &str = "sXcreator";
	const RECEIVER: &str = "sYreceiver";

	fn contract() -> String {
		"c0".repeat(32)
	}

	fn scanner(node: &Arc<MockNode>) -> ChainScanner {
		let engine = ProtocolEngine::new(
			node.clone(),
			Ledger::new().shared(),
			ProtocolParams::default(),
		);
		ChainScanner::new(node.clone(), engine, MessageLog::new().shared())
	}

	/// Store a contract call by the creator and return its txid.
	fn call(node: &MockNode, txid: &str, message: &str) -> String {
		let funding = fund(node, &format!("fund-{txid}"), CREATOR);
		node.insert_transaction(transaction(
			txid,
			vec![funding],
			vec![data_output(message), output(1.0, CREATOR)],
		));
		txid.to_string()
	}

	/// Chain up to height 120 with a token created at 100 and mints at 103, 107 and 112.
	fn chain_with_activity() -> Arc<MockNode> {
		let node = Arc::new(MockNode::new());
		let params = ProtocolParams::default();
		node.extend_to(99);

		let funding = fund(&node, "fund-create", CREATOR);
		node.insert_transaction(transaction(
			&contract(),
			vec![funding],
			vec![
				data_output("SCPCREATE MyToken MTK 1000000"),
				output(10.0, &params.deploy_fee_address),
				output(1.0, CREATOR),
			],
		));
		node.push_block(&[&contract()]);

		for height in 101..=120 {
			if [103, 107, 112].contains(&height) {
				let txid = call(&node, &format!("mint-{height}"), &format!("{} mint 10", contract()));
				node.push_block(&[&txid]);
			} else {
				node.push_block(&[]);
			}
		}
		node
	}

	async fn activity_count(scanner: &ChainScanner) -> usize {
		scanner.engine().ledger().read().await.activity_count()
	}

	#[tokio::test]
	async fn overlapping_rescan_applies_nothing_twice() {
		let node = chain_with_activity();
		let first = scanner(&node);
		first.scan_range(100..=110).await.unwrap();
		let found = first.scan_range(105..=115).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(first.cursor().await.stats().blocks_skipped, 6);

		let single = scanner(&node);
		single.scan_range(100..=115).await.unwrap();
		assert_eq!(activity_count(&first).await, 3);
		assert_eq!(activity_count(&first).await, activity_count(&single).await);
		assert_eq!(
			first.messages().read().await.confirmed,
			single.messages().read().await.confirmed
		);
	}

	#[tokio::test]
	async fn forward_links_replace_hash_lookups() {
		let node = chain_with_activity();
		let scanner = scanner(&node);
		scanner.scan_range(100..=110).await.unwrap();
		assert_eq!(node.calls("getblockhash"), 1);
		assert_eq!(node.calls("getblock"), 11);

		// Skipped heights 105..=110 clear the link, so 111 is resolved by height too
		scanner.scan_range(105..=115).await.unwrap();
		assert_eq!(node.calls("getblockhash"), 1 + 7);
		assert_eq!(node.calls("getblock"), 11 + 5);
	}

	#[tokio::test]
	async fn coinbase_only_blocks_fetch_no_transactions() {
		let node = Arc::new(MockNode::new());
		node.extend_to(10);
		let scanner = scanner(&node);
		let found = scanner.scan_range(0..=10).await.unwrap();
		assert!(found.is_empty());
		assert_eq!(node.calls("getrawtransaction"), 0);
		assert_eq!(scanner.cursor().await.processed_count(), 11);
		assert_eq!(scanner.engine().ledger().read().await.height(), 10);
	}

	#[tokio::test]
	async fn faulty_transaction_does_not_stop_the_block() {
		let node = chain_with_activity();
		let broken = call(&node, "broken", &format!("{} mint 1", contract()));
		node.fail_transaction(&broken);
		let mint = call(&node, "mint-121", &format!("{} mint 25", contract()));
		node.push_block(&[&broken, &mint]);

		let scanner = scanner(&node);
		scanner.scan_range(100..=121).await.unwrap();
		let ledger = scanner.engine().ledger().read().await;
		let account = ledger.token(&contract()).unwrap().account(CREATOR).unwrap();
		assert_eq!(account.balance, 55);
		assert_eq!(scanner.cursor().await.stats().faults, 1);
	}

	#[tokio::test]
	async fn activity_follows_chain_order() {
		let node = chain_with_activity();
		node.add_valid_address(RECEIVER);
		let send = call(&node, "send", &format!("{} send 5 {RECEIVER}", contract()));
		let burn = call(&node, "burn", &format!("{} burn 3", contract()));
		node.push_block(&[&send, &burn]);

		let scanner = scanner(&node);
		scanner.scan_range(100..=121).await.unwrap();
		let ledger = scanner.engine().ledger().read().await;
		let kinds: Vec<_> = ledger
			.token(&contract())
			.unwrap()
			.account(CREATOR)
			.unwrap()
			.activity
			.iter()
			.map(|a| (a.kind, a.block))
			.collect();
		assert_eq!(
			kinds,
			vec![
				(ActivityType::Mint, 103),
				(ActivityType::Mint, 107),
				(ActivityType::Mint, 112),
				(ActivityType::Sent, 121),
				(ActivityType::Burn, 121),
			]
		);
	}

	#[tokio::test]
	async fn rejected_messages_are_still_logged() {
		let node = chain_with_activity();
		let bogus = call(&node, "bogus", &format!("{} mint 0", contract()));
		node.push_block(&[&bogus]);

		let scanner = scanner(&node);
		let found = scanner.scan_range(121..=121).await.unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].height, Some(121));
		assert!(!found[0].mempool);
		assert_eq!(scanner.messages().read().await.by_txid("bogus").len(), 1);
	}

	#[tokio::test]
	async fn block_lookup_failure_aborts_the_scan() {
		let node = chain_with_activity();
		let scanner = scanner(&node);
		assert!(matches!(
			scanner.scan_range(119..=125).await,
			Err(ScanError::Rpc(_))
		));
		// Blocks before the failure stay processed
		assert_eq!(scanner.cursor().await.highest_height(), Some(120));
	}
}
