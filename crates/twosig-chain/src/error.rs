//! # Runtime Error Types

use thiserror::Error;
use twosig_core::Address;
use twosig_escrow::{ErrorKind, EscrowError};
use twosig_ledger::{CodeKind, LedgerError};

/// A transaction that reverted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The escrow or factory rejected the call.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// A direct ledger call failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// No contract of the expected kind lives at the address.
    #[error("no {expected} deployed at {address}")]
    UnknownContract {
        /// The address called.
        address: Address,
        /// What the caller expected to find there.
        expected: CodeKind,
    },
}

impl ChainError {
    /// The error class of the revert.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Escrow(e) => e.kind(),
            Self::Ledger(LedgerError::CallFailed { .. }) => ErrorKind::Collaborator,
            Self::Ledger(_) => ErrorKind::Resource,
            Self::UnknownContract { .. } => ErrorKind::InvalidInput,
        }
    }
}
