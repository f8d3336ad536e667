//! Resumable scan cursor.
//!
//! The cursor records the hash of every block whose transactions have been handed to the
//! protocol, so overlapping scans never apply a block twice. It also keeps per-scan counters
//! for progress logging.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Blocks between two progress lines
const PROGRESS_LOG_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanCursor {
	/// Hashes of every block processed so far
	processed: HashSet<String>,
	/// Highest height ever processed
	highest_height: Option<u64>,
	#[serde(skip)]
	session: ScanStats,
	#[serde(skip)]
	last_logged_height: u64,
}

/// Counters for a single scan invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
	pub start_height: u64,
	pub end_height: u64,
	pub blocks_processed: usize,
	pub blocks_skipped: usize,
	pub transactions_processed: usize,
	pub messages_found: usize,
	pub faults: usize,
}

impl ScanStats {
	pub fn summary(&self) -> String {
		format!(
			"Scan of {}..={}: {} blocks processed, {} skipped, {} transactions, {} messages{}",
			self.start_height,
			self.end_height,
			self.blocks_processed,
			self.blocks_skipped,
			self.transactions_processed,
			self.messages_found,
			if self.faults == 0 {
				String::new()
			} else {
				format!(" ({} faults)", self.faults)
			}
		)
	}
}

impl ScanCursor {
	pub fn new() -> Self {
		Self::default()
	}

	/// True until the first block has been processed.
	pub fn is_empty(&self) -> bool {
		self.processed.is_empty()
	}

	pub fn is_processed(&self, hash: &str) -> bool {
		self.processed.contains(hash)
	}

	pub fn highest_height(&self) -> Option<u64> {
		self.highest_height
	}

	pub fn processed_count(&self) -> usize {
		self.processed.len()
	}

	/// Reset the per-scan counters for a scan over `start..=end`.
	pub fn begin_scan(&mut self, start: u64, end: u64) {
		self.session = ScanStats {
			start_height: start,
			end_height: end,
			..Default::default()
		};
		self.last_logged_height = start;
	}

	/// Mark the block `hash` at `height` as processed.
	pub fn record_block(&mut self, hash: &str, height: u64) {
		self.processed.insert(hash.to_string());
		self.highest_height = Some(self.highest_height.map_or(height, |h| h.max(height)));
		self.session.blocks_processed += 1;
	}

	pub fn record_skip(&mut self) {
		self.session.blocks_skipped += 1;
	}

	pub fn record_transaction(&mut self, has_message: bool) {
		self.session.transactions_processed += 1;
		if has_message {
			self.session.messages_found += 1;
		}
	}

	pub fn record_fault(&mut self) {
		self.session.faults += 1;
	}

	pub fn stats(&self) -> &ScanStats {
		&self.session
	}

	/// Log progress every 1000 blocks, or unconditionally when `force` is set.
	pub fn log_progress(&mut self, height: u64, force: bool) {
		let blocks_since_last_log = height.saturating_sub(self.last_logged_height);
		if force || blocks_since_last_log >= PROGRESS_LOG_INTERVAL {
			info!(
				"Scan progress: {} blocks, {} transactions, {} messages up to height {}",
				self.session.blocks_processed,
				self.session.transactions_processed,
				self.session.messages_found,
				height
			);
			self.last_logged_height = height;
		}
	}
}
