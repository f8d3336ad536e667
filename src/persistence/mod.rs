//! Snapshot persistence.
//!
//! The ledger is only reproducible together with the scan cursor that produced it, so both
//! are saved and restored as one snapshot.

/// Snapshot repositories
pub mod repositories;

pub use repositories::*;
