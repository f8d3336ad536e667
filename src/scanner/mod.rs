//! Chain scanning pipeline.
//!
//! This module turns the base chain into a stream of protocol messages and feeds them to the
//! protocol engine:
//!
//! - `chain`: sequential block-range scanning with fault isolation per transaction
//! - `cursor`: the processed-block set that makes overlapping scans idempotent
//! - `messages`: log of every message found, confirmed or pending
//! - `scheduler`: periodic ticks with at most one scan in flight

/// Block-range scanner
pub mod chain;
/// Processed-block cursor and scan statistics
pub mod cursor;
/// Scanned message log
pub mod messages;
/// Periodic scan scheduling
pub mod scheduler;

pub use chain::{ChainScanner, ScanError};
pub use cursor::{ScanCursor, ScanStats};
pub use messages::{MessageLog, ScannedMessage, SharedMessageLog};
pub use scheduler::ScanScheduler;
