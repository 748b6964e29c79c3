//! # Addresses
//!
//! `Address` identifies every participant on the ledger: externally owned
//! accounts, collaborator assets, escrows and factories all share one
//! 20-byte namespace.
//!
//! ## Derivation
//!
//! Contract addresses are derived, never chosen: [`Address::derive`] hashes
//! the creator and the creator's deployment sequence number with SHA-256 and
//! keeps the trailing 20 bytes. Two deployments therefore never share an
//! identity, which is what makes factory-created escrows independent of
//! their siblings.
//!
//! ## Null Address
//!
//! [`Address::NULL`] (all zero bytes) is never produced by derivation in
//! practice and carries meaning: an unassigned signer slot, a cleared
//! controller, or the native currency when passed as a token.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte ledger address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null address.
    pub const NULL: Address = Address([0u8; ADDRESS_LEN]);

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the null address.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Derive the address of the `sequence`-th contract deployed by `creator`.
    pub fn derive(creator: &Address, sequence: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"twosig:contract:");
        hasher.update(creator.0);
        hasher.update(sequence.to_be_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Deterministic externally owned address for a human-readable label.
    ///
    /// Scenarios, the CLI and tests name accounts ("owner", "alice") and
    /// resolve them through this function so the same label always maps to
    /// the same address.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"twosig:account:");
        hasher.update(label.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Self(bytes)
    }

    /// Render as `0x` followed by 40 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        let hex: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{hex}")
    }

    /// Parse `0x`-prefixed (or bare) hex. Case-insensitive.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if !digits.is_ascii() {
            return Err(invalid("non-ASCII characters"));
        }
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(invalid("expected 40 hex digits"));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &digits[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid("non-hex digit"))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
