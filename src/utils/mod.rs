//!
//! Utility module.
//!
//! Formatting helpers for log output.
/// Amount formatting
pub mod index;

pub use index::{TOKEN_DECIMALS, format_token_amount, format_units};
