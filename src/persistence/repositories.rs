use crate::ledger::Ledger;
use crate::scanner::{MessageLog, ScanCursor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

const SNAPSHOT_FILENAME: &str = "scp_snapshot.json";

/// Error types for snapshot persistence
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
	#[error("Snapshot I/O failed: {0}")]
	Io(#[from] std::io::Error),

	#[error("Snapshot encoding failed: {0}")]
	Json(#[from] serde_json::Error),
}

/// Ledger, cursor and confirmed messages captured at the same point of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
	pub ledger: Ledger,
	pub cursor: ScanCursor,
	/// Confirmed messages only; pending ones are never written.
	#[serde(default)]
	pub messages: MessageLog,
	pub height: u64,
	/// RFC 3339 time of capture
	pub saved_at: String,
}

impl Snapshot {
	pub fn new(ledger: Ledger, cursor: ScanCursor, messages: MessageLog) -> Self {
		Self {
			height: ledger.height(),
			ledger,
			cursor,
			messages,
			saved_at: chrono::Utc::now().to_rfc3339(),
		}
	}
}

/// Repository for ledger snapshots
#[async_trait::async_trait]
pub trait SnapshotRepository: Send + Sync {
	async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
	async fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;
}

/// File-based implementation of SnapshotRepository
pub struct FileSnapshotRepository {
	data_dir: PathBuf,
}

impl FileSnapshotRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_snapshot_filename(&self) -> PathBuf {
		self.data_dir.join(SNAPSHOT_FILENAME)
	}
}

#[async_trait::async_trait]
impl SnapshotRepository for FileSnapshotRepository {
	async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
		tokio::fs::create_dir_all(&self.data_dir).await?;
		let content = serde_json::to_string_pretty(snapshot)?;

		// Write then rename, so readers never see a partial file
		let filename = self.get_snapshot_filename();
		let temp_filename = filename.with_extension("json.tmp");
		tokio::fs::write(&temp_filename, content).await?;
		tokio::fs::rename(&temp_filename, &filename).await?;

		info!(
			"Saved snapshot to {:?} at height {}",
			filename, snapshot.height
		);
		Ok(())
	}

	async fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
		let filename = self.get_snapshot_filename();
		if !tokio::fs::try_exists(&filename).await? {
			return Ok(None);
		}

		let content = tokio::fs::read_to_string(&filename).await?;
		let snapshot: Snapshot = serde_json::from_str(&content)?;
		info!(
			"Loaded snapshot from {:?} at height {} (saved {})",
			filename, snapshot.height, snapshot.saved_at
		);
		Ok(Some(snapshot))
	}
}
