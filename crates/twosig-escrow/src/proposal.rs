//! # Withdrawal Proposal
//!
//! At most one proposal is outstanding per escrow. A proposal with a null
//! receiver is the empty proposal; the escrow stores `None` instead and
//! exposes [`Proposal::EMPTY`] to readers.

use serde::{Deserialize, Serialize};
use twosig_core::{Address, Amount};

use crate::config::{REQUIRED_APPROVALS, SIGNER_SLOTS};

/// A pending withdrawal and its per-slot approval flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Asset to withdraw; the null address means native currency.
    pub token: Address,
    /// Recipient. Never null for an active proposal.
    pub receiver: Address,
    /// Units to send.
    pub amount: Amount,
    /// Approval flag per signer slot.
    pub approvals: [bool; SIGNER_SLOTS],
}

impl Proposal {
    /// The "no proposal" value.
    pub const EMPTY: Proposal = Proposal {
        token: Address::NULL,
        receiver: Address::NULL,
        amount: Amount::ZERO,
        approvals: [false; SIGNER_SLOTS],
    };

    /// A fresh proposal with no approvals.
    pub fn new(token: Address, receiver: Address, amount: Amount) -> Self {
        Self {
            token,
            receiver,
            amount,
            approvals: [false; SIGNER_SLOTS],
        }
    }

    /// Whether this proposal can be signed or executed.
    pub fn is_active(&self) -> bool {
        !self.receiver.is_null()
    }

    /// Whether the withdrawal is in native currency.
    pub fn is_native(&self) -> bool {
        self.token.is_null()
    }

    /// Number of approval flags set.
    pub fn approval_count(&self) -> usize {
        self.approvals.iter().filter(|a| **a).count()
    }

    /// Whether every signer approved.
    pub fn has_quorum(&self) -> bool {
        self.approval_count() >= REQUIRED_APPROVALS
    }
}

impl Default for Proposal {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_inactive() {
        assert!(!Proposal::EMPTY.is_active());
        assert!(Proposal::EMPTY.is_native());
        assert_eq!(Proposal::default(), Proposal::EMPTY);
    }

    #[test]
    fn quorum_needs_both_flags() {
        let mut p = Proposal::new(Address::NULL, Address::from_label("bob"), Amount::new(5));
        assert!(p.is_active());
        assert!(!p.has_quorum());
        p.approvals[0] = true;
        assert_eq!(p.approval_count(), 1);
        assert!(!p.has_quorum());
        p.approvals[1] = true;
        assert!(p.has_quorum());
    }
}
