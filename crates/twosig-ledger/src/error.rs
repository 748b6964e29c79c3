//! # Ledger Error Types

use thiserror::Error;
use twosig_core::{Address, Amount};

/// Errors raised by ledger operations.
///
/// `CallFailed` is deliberately uninformative: a call aimed at an address
/// that does not implement the asset interface has no meaningful reason
/// to report beyond "the call reverted".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The sender does not hold enough units.
    #[error("insufficient balance of {token} for {holder}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Token being moved (null address for native currency).
        token: Address,
        /// The holder that came up short.
        holder: Address,
        /// Units requested.
        requested: Amount,
        /// Units held.
        available: Amount,
    },

    /// A low-level call to `target` reverted.
    #[error("call to {target} reverted")]
    CallFailed {
        /// The address that was called.
        target: Address,
    },

    /// Crediting `holder` would overflow its balance.
    #[error("balance overflow crediting {holder} with {token}")]
    Overflow {
        /// Token being credited (null address for native currency).
        token: Address,
        /// The holder whose balance would overflow.
        holder: Address,
    },
}
