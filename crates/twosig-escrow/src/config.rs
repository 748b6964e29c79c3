//! # Quorum Configuration
//!
//! The escrow supports exactly one shape: two signer slots, both of which
//! must approve. Any other signer count or quorum is refused at deployment.

use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// Number of signer slots.
pub const SIGNER_SLOTS: usize = 2;

/// Approvals required to execute.
pub const REQUIRED_APPROVALS: usize = 2;

/// Deployment parameters of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Signer slots. Must be 2.
    pub signer_count: u8,
    /// Required approvals. Must be 2.
    pub quorum: u8,
    /// Initial value of the nonce counter.
    #[serde(default)]
    pub nonce_seed: u64,
}

impl QuorumConfig {
    /// The only supported configuration, with a zero nonce seed.
    pub const TWO_OF_TWO: QuorumConfig = QuorumConfig {
        signer_count: SIGNER_SLOTS as u8,
        quorum: REQUIRED_APPROVALS as u8,
        nonce_seed: 0,
    };

    /// Build and validate a configuration.
    pub fn new(signer_count: u8, quorum: u8) -> Result<Self, EscrowError> {
        let config = Self {
            signer_count,
            quorum,
            nonce_seed: 0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Same configuration with a different starting nonce.
    pub fn with_nonce_seed(self, nonce_seed: u64) -> Self {
        Self { nonce_seed, ..self }
    }

    /// Reject anything but 2-of-2.
    pub fn validate(&self) -> Result<(), EscrowError> {
        if usize::from(self.signer_count) != SIGNER_SLOTS
            || usize::from(self.quorum) != REQUIRED_APPROVALS
        {
            return Err(EscrowError::Configuration {
                signer_count: self.signer_count,
                quorum: self.quorum,
            });
        }
        Ok(())
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self::TWO_OF_TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn two_of_two_is_accepted() {
        let config = QuorumConfig::new(2, 2).unwrap();
        assert_eq!(config, QuorumConfig::TWO_OF_TWO);
        assert_eq!(QuorumConfig::default(), config);
    }

    #[test]
    fn other_shapes_fail_fast() {
        for (n, q) in [(3, 2), (2, 1), (1, 1), (0, 0), (5, 3)] {
            let err = QuorumConfig::new(n, q).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{n}-of-{q}");
        }
    }

    #[test]
    fn nonce_seed_defaults_to_zero_in_yaml_and_json() {
        let config: QuorumConfig =
            serde_json::from_str(r#"{"signer_count":2,"quorum":2}"#).unwrap();
        assert_eq!(config.nonce_seed, 0);
        assert_eq!(config.with_nonce_seed(7).nonce_seed, 7);
    }
}
