//! StakeCube Protocol state sync.
//!
//! Scans a StakeCube Core daemon's chain for protocol messages carried in data-carrier
//! outputs and derives the token ledger from them.

pub mod config;
pub mod extractor;
pub mod ledger;
pub mod mempool;
pub mod node;
pub mod persistence;
pub mod protocol;
pub mod scanner;
pub mod utils;
