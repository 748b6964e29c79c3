//! # Collaborator Assets
//!
//! The fungible-asset interface the escrow depends on but does not
//! implement: a balance query by holder and a transfer between holders.
//! The ledger owns every deployed asset as a `Box<dyn FungibleAsset>` and
//! translates [`TransferError`]s into [`LedgerError`](crate::LedgerError)s
//! tagged with the asset's address.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twosig_core::{Address, Amount};

/// Why an asset refused a transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The sender holds fewer units than requested.
    #[error("insufficient balance: {available} available")]
    Insufficient {
        /// Units the sender holds.
        available: Amount,
    },
    /// The recipient's balance would overflow.
    #[error("recipient balance would overflow")]
    Overflow,
    /// The asset reverted for its own reasons (paused, blocklisted, ...).
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// The balance/transfer interface of a fungible asset contract.
///
/// Implementations must leave their state untouched when `transfer`
/// returns an error.
pub trait FungibleAsset: fmt::Debug + Send {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Ticker symbol.
    fn symbol(&self) -> &str;

    /// Units in existence.
    fn total_supply(&self) -> Amount;

    /// Units held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Move `amount` units from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount)
        -> Result<(), TransferError>;

    /// Clone into a fresh box. Needed so the runtime can snapshot the ledger.
    fn clone_box(&self) -> Box<dyn FungibleAsset>;
}

impl Clone for Box<dyn FungibleAsset> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Reference fungible asset: fixed supply minted to the deployer, plain
/// balance-checked transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardToken {
    name: String,
    symbol: String,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
}

impl StandardToken {
    /// Create a token and mint `supply` to `holder`.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, holder: Address, supply: Amount) -> Self {
        let mut balances = BTreeMap::new();
        if !supply.is_zero() {
            balances.insert(holder, supply);
        }
        Self {
            name: name.into(),
            symbol: symbol.into(),
            total_supply: supply,
            balances,
        }
    }
}

impl FungibleAsset for StandardToken {
    fn name(&self) -> &str {
        &self.name
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        let debited = available
            .checked_sub(amount)
            .ok_or(TransferError::Insufficient { available })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.balances.insert(*from, debited);
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FungibleAsset> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> (StandardToken, Address) {
        let owner = Address::from_label("owner");
        (
            StandardToken::new("SampleCoin", "SMPL", owner, Amount::new(1_000_000)),
            owner,
        )
    }

    #[test]
    fn supply_is_minted_to_holder() {
        let (token, owner) = coin();
        assert_eq!(token.total_supply(), Amount::new(1_000_000));
        assert_eq!(token.balance_of(&owner), Amount::new(1_000_000));
        assert_eq!(token.balance_of(&Address::from_label("nobody")), Amount::ZERO);
        assert_eq!(token.symbol(), "SMPL");
        assert_eq!(token.name(), "SampleCoin");
    }

    #[test]
    fn transfer_moves_units() {
        let (mut token, owner) = coin();
        let alice = Address::from_label("alice");
        token.transfer(&owner, &alice, Amount::new(10)).unwrap();
        assert_eq!(token.balance_of(&alice), Amount::new(10));
        assert_eq!(token.balance_of(&owner), Amount::new(999_990));
    }

    #[test]
    fn overdraft_is_rejected_without_side_effects() {
        let (mut token, owner) = coin();
        let alice = Address::from_label("alice");
        let before = token.clone();
        let err = token.transfer(&alice, &owner, Amount::new(1)).unwrap_err();
        assert_eq!(err, TransferError::Insufficient { available: Amount::ZERO });
        assert_eq!(token, before);
    }

    #[test]
    fn transfer_errors_render_their_cause() {
        let insufficient = TransferError::Insufficient { available: Amount::new(7) };
        assert_eq!(insufficient.to_string(), "insufficient balance: 7 available");
        assert_eq!(TransferError::Overflow.to_string(), "recipient balance would overflow");
        let rejected = TransferError::Rejected("paused".into());
        assert_eq!(rejected.to_string(), "transfer rejected: paused");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(rejected);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn self_transfer_is_a_no_op() {
        let (mut token, owner) = coin();
        token.transfer(&owner, &owner, Amount::new(500)).unwrap();
        assert_eq!(token.balance_of(&owner), Amount::new(1_000_000));
    }

    #[test]
    fn boxed_clone_is_independent() {
        let (token, owner) = coin();
        let mut boxed: Box<dyn FungibleAsset> = Box::new(token);
        let copy = boxed.clone();
        boxed
            .transfer(&owner, &Address::from_label("bob"), Amount::new(1))
            .unwrap();
        assert_eq!(copy.balance_of(&owner), Amount::new(1_000_000));
    }
}
