//! # twosig-ledger — Host Ledger
//!
//! The escrow never keeps its own books. It reads balances from, and moves
//! value through, the ledger it is deployed on. This crate is that ledger:
//!
//! - **Native currency** ([`Ledger::native_balance`], [`Ledger::transfer_native`]):
//!   per-address balances. Any transfer to an address is accepted
//!   unconditionally, which is how escrows receive native deposits.
//!
//! - **Collaborator assets** ([`asset`]): contracts that honour the
//!   [`FungibleAsset`] balance/transfer interface. [`StandardToken`] is the
//!   reference implementation. Calls aimed at an address without an asset
//!   fail with the opaque [`LedgerError::CallFailed`].
//!
//! - **Code registry**: which addresses hold contract code, and of what kind.
//!   New contract addresses are derived from the creator and its deployment
//!   count, so every deployment has a fresh identity.
//!
//! - **Blocks and log**: events are appended to the log with the number of
//!   the block under construction; [`Ledger::seal_block`] closes it.
//!
//! ## Crate Policy
//!
//! - Every mutating method validates before it writes. A returned error
//!   means nothing changed.
//! - Transaction-level atomicity (rolling back several calls) is driven by
//!   the runtime in `twosig-chain` through [`Ledger::checkpoint`] and
//!   [`Ledger::rollback`].

pub mod asset;
pub mod error;
pub mod ledger;

pub use asset::{FungibleAsset, StandardToken};
pub use error::LedgerError;
pub use ledger::{BlockHeader, Checkpoint, CodeKind, Ledger};
