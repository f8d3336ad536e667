//! Unconfirmed transactions and the protocol messages they carry.
//!
//! Pending messages are informational. They are never applied to the ledger; a message only
//! takes effect once its transaction is scanned in a block.

use crate::extractor::extract_message;
use crate::node::{NodeRpc, RawTransaction, RpcError};
use crate::scanner::ScannedMessage;
use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, warn};

/// Transactions fetched from the daemon at once
const FETCH_CONCURRENCY: usize = 8;
/// Daemon error code for an unknown transaction
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

/// Every mempool transaction in mempool order.
///
/// Transactions that leave the mempool between listing and fetching are skipped.
pub async fn full_mempool(node: &dyn NodeRpc) -> Result<Vec<RawTransaction>, RpcError> {
	let txids = node.get_raw_mempool().await?;
	let results: Vec<_> = stream::iter(txids)
		.map(|txid| async move { (node.get_raw_transaction(&txid).await, txid) })
		.buffered(FETCH_CONCURRENCY)
		.collect()
		.await;

	let mut transactions = Vec::with_capacity(results.len());
	for (result, txid) in results {
		match result {
			Ok(tx) => transactions.push(tx),
			Err(RpcError::Rpc { code, .. }) if code == RPC_INVALID_ADDRESS_OR_KEY => {
				debug!("Mempool transaction {} vanished before it was fetched", txid);
			}
			Err(e) => return Err(e),
		}
	}
	Ok(transactions)
}

/// Messages carried by mempool transactions.
pub async fn pending_messages(node: &dyn NodeRpc) -> Result<Vec<ScannedMessage>, RpcError> {
	let transactions = full_mempool(node).await?;
	let mut messages = Vec::new();
	for tx in transactions {
		match extract_message(&tx) {
			Ok(Some(msg)) => messages.push(ScannedMessage {
				msg,
				txid: tx.txid,
				time: None,
				height: None,
				mempool: true,
			}),
			Ok(None) => {}
			Err(e) => warn!("Skipping undecodable mempool transaction {}: {}", tx.txid, e),
		}
	}
	Ok(messages)
}
