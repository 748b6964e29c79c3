//! # twosig-escrow — Two-Party Multisig Escrow
//!
//! A minimal 2-of-2 escrow and the factory that stamps out instances.
//!
//! - [`escrow`]: the contract. Priming, nonce-guarded proposals and
//!   approvals, execution against live balances.
//! - [`phase`]: the one-way `Unprimed → Primed` transition.
//! - [`proposal`]: the single outstanding withdrawal.
//! - [`factory`]: fresh, independent escrows from a reference.
//! - [`config`]: the only supported quorum shape.
//!
//! ## Crate Policy
//!
//! - Operations take the caller explicitly and the [`Ledger`](twosig_ledger::Ledger)
//!   they run against. There is no ambient sender.
//! - A returned error means the escrow and the ledger are unchanged.
//! - Rejection messages for the public contract surface keep their
//!   established wording; see [`EscrowError`].

pub mod config;
pub mod error;
pub mod escrow;
pub mod factory;
pub mod phase;
pub mod proposal;

pub use config::{QuorumConfig, REQUIRED_APPROVALS, SIGNER_SLOTS};
pub use error::{ErrorKind, EscrowError};
pub use escrow::{Escrow, EscrowSnapshot};
pub use factory::EscrowFactory;
pub use phase::Phase;
pub use proposal::Proposal;
