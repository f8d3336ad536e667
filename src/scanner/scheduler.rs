//! Periodic scan scheduling.
//!
//! A tick fires on a fixed period. Each tick starts a scan in its own task unless the previous
//! one is still running, in which case the tick does nothing. A cold scanner covers everything
//! from the protocol genesis to the tip; a warm one rescans only the last few blocks.

use super::chain::{ChainScanner, ScanError};
use crate::config::ScanConfig;
use crate::mempool::pending_messages;
use crate::node::NodeRpc;
use crate::persistence::{Snapshot, SnapshotRepository};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Clears the in-flight flag when the scan task ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

#[derive(Clone)]
pub struct ScanScheduler {
	scanner: Arc<ChainScanner>,
	node: Arc<dyn NodeRpc>,
	genesis_height: u64,
	config: ScanConfig,
	in_flight: Arc<AtomicBool>,
	snapshots: Option<Arc<dyn SnapshotRepository>>,
}

impl ScanScheduler {
	pub fn new(
		scanner: Arc<ChainScanner>,
		node: Arc<dyn NodeRpc>,
		genesis_height: u64,
		config: ScanConfig,
	) -> Self {
		Self {
			scanner,
			node,
			genesis_height,
			config,
			in_flight: Arc::new(AtomicBool::new(false)),
			snapshots: None,
		}
	}

	/// Save a snapshot after every scan that processed new blocks.
	pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotRepository>) -> Self {
		self.snapshots = Some(snapshots);
		self
	}

	pub fn is_scanning(&self) -> bool {
		self.in_flight.load(Ordering::Acquire)
	}

	/// Tick until Ctrl-C is received.
	pub async fn run(&self) {
		info!(
			"Scanning every {} seconds, warm depth {} blocks",
			self.config.interval.as_secs(),
			self.config.warm_depth
		);
		let mut ticker = tokio::time::interval(self.config.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let shutdown = tokio::signal::ctrl_c();
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					self.tick();
				}
				result = &mut shutdown => {
					if let Err(e) = result {
						error!("Failed to listen for shutdown signal: {}", e);
					}
					info!("Shutting down scheduler");
					break;
				}
			}
		}
	}

	/// Start a scan unless one is already in flight.
	pub fn tick(&self) -> Option<JoinHandle<()>> {
		if self
			.in_flight
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			debug!("Previous scan still in flight, skipping tick");
			return None;
		}
		let guard = InFlightGuard(self.in_flight.clone());

		let scheduler = self.clone();
		Some(tokio::spawn(async move {
			let _guard = guard;
			if let Err(e) = scheduler.scan_once().await {
				error!("Scan failed: {}", e);
			}
		}))
	}

	/// Heights the next scan should cover.
	pub async fn plan(&self) -> Result<RangeInclusive<u64>, ScanError> {
		if self.scanner.is_cold().await {
			let count = self.scanner.block_count().await?;
			info!(
				"Cold start, scanning from genesis {} to {}",
				self.genesis_height, count
			);
			Ok(self.genesis_height..=count)
		} else {
			let tip = self.scanner.tip_height().await?;
			let mut start = tip.saturating_sub(self.config.warm_depth);
			// A restored cursor can lag the tip by more than the warm depth
			if let Some(resume) = self
				.scanner
				.cursor()
				.await
				.highest_height()
				.map(|h| h.saturating_add(1))
			{
				if resume < start {
					info!("Catching up from height {} to {}", resume, tip);
					start = resume;
				}
			}
			Ok(start..=tip)
		}
	}

	async fn scan_once(&self) -> Result<(), ScanError> {
		let range = self.plan().await?;
		self.scanner.scan_range(range).await?;

		match pending_messages(self.node.as_ref()).await {
			Ok(pending) => self
				.scanner
				.messages()
				.write()
				.await
				.replace_pending(pending),
			Err(e) => warn!("Failed to refresh mempool messages: {}", e),
		}

		if let Some(snapshots) = &self.snapshots {
			let cursor = self.scanner.cursor().await;
			if cursor.stats().blocks_processed > 0 {
				let ledger = self.scanner.engine().ledger().read().await.clone();
				let messages = self.scanner.messages().read().await.clone();
				let snapshot = Snapshot::new(ledger, cursor, messages);
				if let Err(e) = snapshots.save(&snapshot).await {
					error!("Failed to save snapshot: {}", e);
				}
			}
		}
		Ok(())
	}
}
