//! # twosig-chain — Chain Runtime
//!
//! Hosts escrows on an in-process ledger and gives every call transaction
//! semantics.
//!
//! - [`chain`]: [`Chain`], the shared handle. One lock, snapshot on entry,
//!   commit seals a block, error restores the snapshot.
//! - [`config`]: [`ChainConfig`], genesis balances and nonce seed from YAML.
//! - [`scenario`]: [`Scenario`], YAML scripts of transactions with expected
//!   outcomes, and the [`ScenarioReport`] they produce.
//! - [`error`]: [`ChainError`], a revert with its [`ErrorKind`](twosig_escrow::ErrorKind).

pub mod chain;
pub mod config;
pub mod error;
pub mod scenario;

pub use chain::{Chain, World};
pub use config::{resolve_account, ChainConfig, ConfigError, GenesisAccount};
pub use error::ChainError;
pub use scenario::{Scenario, ScenarioError, ScenarioReport, ScenarioStep, Step};
