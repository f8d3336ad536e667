//! Log of every data-carrier message seen on chain or in the mempool.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedMessageLog = Arc<RwLock<MessageLog>>;

/// One message together with the transaction and block carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannedMessage {
	pub msg: String,
	pub txid: String,
	/// Block time, absent for mempool entries
	pub time: Option<i64>,
	pub height: Option<u64>,
	pub mempool: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
	/// Confirmed messages in scan order, accepted by the protocol or not.
	pub confirmed: Vec<ScannedMessage>,
	/// Messages of unconfirmed transactions, replaced after every scan.
	#[serde(skip)]
	pub pending: Vec<ScannedMessage>,
}

impl MessageLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn shared(self) -> SharedMessageLog {
		Arc::new(RwLock::new(self))
	}

	pub fn extend_confirmed(&mut self, messages: impl IntoIterator<Item = ScannedMessage>) {
		self.confirmed.extend(messages);
	}

	pub fn replace_pending(&mut self, messages: Vec<ScannedMessage>) {
		self.pending = messages;
	}

	/// Messages carried by `txid`, confirmed or pending.
	pub fn by_txid(&self, txid: &str) -> Vec<&ScannedMessage> {
		self.confirmed
			.iter()
			.chain(self.pending.iter())
			.filter(|m| m.txid == txid)
			.collect()
	}
}
