//! # twosig-core — Foundational Types
//!
//! Leaf crate of the twosig workspace. Every other crate depends on it; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Addresses are a newtype.** `Address` is a 20-byte value with a
//!    distinguished [`Address::NULL`]. The null address means "unassigned"
//!    for signer slots and "native currency" for token arguments. No bare
//!    strings or byte slices cross crate boundaries.
//!
//! 2. **Amounts never touch floating point.** `Amount` wraps a `u128` of
//!    smallest units, exposes only checked arithmetic, and serializes as a
//!    decimal string so JSON consumers never lose precision.
//!
//! 3. **One closed event enum.** Every notification the ledger can record
//!    is a variant of [`Event`]; adding one forces every consumer to handle it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `twosig-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod amount;
pub mod error;
pub mod event;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use address::{Address, ADDRESS_LEN};
pub use amount::Amount;
pub use error::CoreError;
pub use event::{Event, LogEntry};
pub use temporal::Timestamp;
