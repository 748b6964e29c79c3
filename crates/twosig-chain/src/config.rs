//! # Chain Configuration
//!
//! Loaded from YAML. Everything is optional:
//!
//! ```yaml
//! nonce_seed: 0
//! genesis:
//!   - account: alice
//!     balance: 1000
//!   - account: "0x00000000000000000000000000000000000000aa"
//!     balance: "340282366920938463463374607431768211455"
//! ```
//!
//! Accounts are either `0x`-prefixed hex addresses or labels, which map to
//! addresses through [`Address::from_label`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twosig_core::{Address, Amount};

/// Errors loading a [`ChainConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An account string is neither a label nor a hex address.
    #[error("invalid account {account:?}: {reason}")]
    InvalidAccount {
        /// The offending string.
        account: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A pre-funded account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAccount {
    /// Label or hex address.
    pub account: String,
    /// Native units minted at genesis.
    pub balance: Amount,
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Starting nonce of every escrow deployed directly on this chain.
    #[serde(default)]
    pub nonce_seed: u64,
    /// Native balances minted before the first block.
    #[serde(default)]
    pub genesis: Vec<GenesisAccount>,
}

impl ChainConfig {
    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(path = %path.display(), accounts = config.genesis.len(), "loaded chain config");
        Ok(config)
    }

    /// Parse YAML and validate every account.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.genesis_balances()?;
        Ok(config)
    }

    /// Resolved genesis balances.
    pub fn genesis_balances(&self) -> Result<Vec<(Address, Amount)>, ConfigError> {
        self.genesis
            .iter()
            .map(|g| Ok((resolve_account(&g.account)?, g.balance)))
            .collect()
    }
}

/// Resolve an account string: `0x`-prefixed hex, or a non-empty label.
pub fn resolve_account(account: &str) -> Result<Address, ConfigError> {
    let trimmed = account.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidAccount {
            account: account.to_string(),
            reason: "empty account".to_string(),
        });
    }
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return Address::parse(trimmed).map_err(|e| ConfigError::InvalidAccount {
            account: account.to_string(),
            reason: e.to_string(),
        });
    }
    Ok(Address::from_label(trimmed))
}
