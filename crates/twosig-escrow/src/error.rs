//! # Escrow Error Types
//!
//! Every rejected call maps to one [`ErrorKind`]:
//!
//! - **Authorization**: caller is not the controller or a signer, or named
//!   a slot that is not theirs.
//! - **Nonce**: presented nonce differs from the current counter, in either
//!   direction.
//! - **State**: the operation is invalid in the current phase (assignment
//!   after priming, executing nothing, executing without quorum).
//! - **Resource**: the withdrawal exceeds the live balance.
//! - **Collaborator**: the token address does not honour the asset
//!   interface. Surfaced as an opaque revert.
//! - **Configuration** / **InvalidInput**: bad parameters.
//!
//! Messages for the core rejections keep the wording observers of the
//! deployed contract already match on ("Only signers can do this!", ...).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twosig_core::{Address, Amount};
use twosig_ledger::LedgerError;

/// Error classes for rejected escrow calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller lacks the required role.
    Authorization,
    /// Presented nonce does not match.
    Nonce,
    /// Operation invalid for the current phase.
    State,
    /// Not enough funds.
    Resource,
    /// Collaborator asset call reverted.
    Collaborator,
    /// Unsupported quorum parameters.
    Configuration,
    /// Malformed arguments.
    InvalidInput,
}

impl ErrorKind {
    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Nonce => "nonce",
            Self::State => "state",
            Self::Resource => "resource",
            Self::Collaborator => "collaborator",
            Self::Configuration => "configuration",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected escrow or factory call. Rejections never change state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// Only the controller may assign signers.
    #[error("Only owner can do this!")]
    NotController {
        /// The rejected caller.
        caller: Address,
    },

    /// Only a signer of a primed escrow may propose or sign.
    #[error("Only signers can do this!")]
    NotSigner {
        /// The rejected caller.
        caller: Address,
    },

    /// A signer named a slot that is not their own.
    #[error("unauthorized index {index} for signer {caller}")]
    UnauthorizedIndex {
        /// The signer.
        caller: Address,
        /// The slot they named.
        index: u8,
    },

    /// The presented nonce is stale or future-dated.
    #[error("Wrong nonce: expected {expected}, got {presented}")]
    WrongNonce {
        /// The current counter.
        expected: u64,
        /// What the caller sent.
        presented: u64,
    },

    /// Signer assignment after priming.
    #[error("This function is permanently deactivated!")]
    PermanentlyDeactivated,

    /// Signing or executing with no outstanding proposal.
    #[error("no active proposal")]
    NoActiveProposal,

    /// Executing before both signers approved.
    #[error("quorum not reached: {approvals} of {required} approvals")]
    QuorumNotReached {
        /// Approval flags currently set.
        approvals: usize,
        /// Approvals required.
        required: usize,
    },

    /// The nonce counter cannot advance further.
    #[error("nonce space exhausted")]
    NonceExhausted,

    /// Proposed amount exceeds the live balance.
    #[error("Not enough in deposits: requested {requested} of {token}, available {available}")]
    InsufficientDeposits {
        /// Token requested (null for native currency).
        token: Address,
        /// Units requested.
        requested: Amount,
        /// Units the escrow holds.
        available: Amount,
    },

    /// A ledger call made on the escrow's behalf failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Only two signers with unanimous approval are supported.
    #[error("unsupported quorum configuration: {signer_count} signers with quorum {quorum}; only 2-of-2 is supported")]
    Configuration {
        /// Requested signer count.
        signer_count: u8,
        /// Requested quorum.
        quorum: u8,
    },

    /// A factory was handed a reference other than the one it is bound to.
    #[error("factory is bound to implementation {expected}, got {found}")]
    ImplementationMismatch {
        /// The factory's implementation.
        expected: Address,
        /// The escrow offered as reference.
        found: Address,
    },

    /// Signer slot outside `0..=1`.
    #[error("invalid signer index {0}: must be 0 or 1")]
    InvalidSignerIndex(u8),

    /// The address already holds the other signer slot.
    #[error("{signer} already holds signer slot {index}")]
    DuplicateSigner {
        /// The address offered.
        signer: Address,
        /// The slot it already holds.
        index: u8,
    },

    /// A proposal must name a receiver; the null receiver marks "no proposal".
    #[error("proposal receiver must not be the null address")]
    NullReceiver,
}

impl EscrowError {
    /// The error class of this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotController { .. } | Self::NotSigner { .. } | Self::UnauthorizedIndex { .. } => {
                ErrorKind::Authorization
            }
            Self::WrongNonce { .. } => ErrorKind::Nonce,
            Self::PermanentlyDeactivated
            | Self::NoActiveProposal
            | Self::QuorumNotReached { .. }
            | Self::NonceExhausted => ErrorKind::State,
            Self::InsufficientDeposits { .. } => ErrorKind::Resource,
            Self::Ledger(LedgerError::CallFailed { .. }) => ErrorKind::Collaborator,
            Self::Ledger(LedgerError::InsufficientBalance { .. } | LedgerError::Overflow { .. }) => {
                ErrorKind::Resource
            }
            Self::Configuration { .. } | Self::ImplementationMismatch { .. } => {
                ErrorKind::Configuration
            }
            Self::InvalidSignerIndex(_) | Self::DuplicateSigner { .. } | Self::NullReceiver => {
                ErrorKind::InvalidInput
            }
        }
    }
}
