//! Protocol state machine.
//!
//! Turns decoded data-carrier messages into ledger mutations:
//!
//! - `message`: grammar of `SCPCREATE` deployments and contract calls
//! - `conventions`: positional output layout identifying creators, callers and the fee
//! - `auth`: caller authentication by input ownership
//! - `engine`: validation and dispatch of each operation against the ledger

/// Caller authentication
pub mod auth;
/// Positional output conventions
pub mod conventions;
/// Message dispatch against the ledger
pub mod engine;
/// Message grammar
pub mod message;
/// Outcomes and errors
mod types;

pub use engine::ProtocolEngine;
pub use message::{Operation, parse_message};
pub use types::*;
