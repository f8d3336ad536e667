//! Node daemon integration.
//!
//! This module provides the JSON-RPC client and the types for talking to the base chain's
//! full-node daemon. The daemon is only ever read from: blocks, verbose transactions, the
//! mempool and address validity.

/// JSON-RPC client and the `NodeRpc` seam
mod client;
/// In-memory daemon for tests
#[cfg(test)]
pub mod mock;
/// Type definitions for RPC payloads
mod types;

pub use client::{NodeRpc, NodeRpcClient, decode_envelope};
pub use types::*;
