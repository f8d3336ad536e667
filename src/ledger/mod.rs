//! Token ledger derived from protocol messages.
//!
//! The ledger holds every token definition with its per-account balances and history. It is
//! mutated only by the protocol engine, one message at a time, and read by query layers.

/// Ledger store and cross-token queries
mod store;
/// Token, account and activity records
mod token;

pub use store::*;
pub use token::*;
