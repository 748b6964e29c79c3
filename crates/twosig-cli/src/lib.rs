//! # twosig-cli — Command-Line Interface
//!
//! ## Subcommands
//!
//! - `twosig run <SCENARIO>`: execute a YAML scenario against a fresh
//!   chain and print the outcome (`--json` for the full report).
//! - `twosig check <SCENARIO>`: parse and lint a scenario without running it.
//! - `twosig deploy`: deploy a reference escrow and a factory bound to it,
//!   then print both addresses.
//!
//! ```bash
//! twosig -v run demos/native-withdrawal.yaml
//! twosig --config chain.yaml deploy --deployer alice
//! ```
//!
//! Handlers return an exit code: 0 on success, 1 on failure.

pub mod deploy;
pub mod scenario;

use std::path::Path;

use anyhow::{Context, Result};
use twosig_chain::ChainConfig;

/// Load the chain config at `path`, or the default when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Option<ChainConfig>> {
    path.map(|p| {
        ChainConfig::load(p).with_context(|| format!("loading config {}", p.display()))
    })
    .transpose()
}
