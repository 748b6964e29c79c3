//! # Core Error Types
//!
//! Parse failures for the foundational newtypes. Domain crates define their
//! own error enums and wrap these with `#[from]` where they accept external
//! input.

use thiserror::Error;

/// Errors raised while constructing core types from external input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Address text is not `0x` followed by 40 hex digits.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Amount text is not a non-negative integer that fits in 128 bits.
    #[error("invalid amount {0:?}: expected a non-negative integer")]
    InvalidAmount(String),
}
