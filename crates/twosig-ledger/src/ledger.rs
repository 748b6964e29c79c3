//! # Ledger State
//!
//! Balances, deployed assets, the code registry, sealed blocks and the event
//! log.
//!
//! ## Rollback
//!
//! [`Ledger::checkpoint`] opens an undo journal. Every write made after it
//! records the prior value of the one entry it touches, and
//! [`Ledger::rollback`] replays those records newest first and truncates the
//! log. [`Ledger::seal_block`] closes the journal. A revert therefore costs
//! what the reverted call wrote, independent of the ledger's history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use twosig_core::{Address, Amount, Event, LogEntry, Timestamp};

use crate::asset::{FungibleAsset, StandardToken, TransferError};
use crate::error::LedgerError;

/// What kind of contract lives at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// A fungible asset.
    Asset,
    /// A multisig escrow.
    Escrow,
    /// An escrow factory.
    Factory,
}

impl CodeKind {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Escrow => "escrow",
            Self::Factory => "factory",
        }
    }
}

impl std::fmt::Display for CodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number, starting at 1.
    pub number: u64,
    /// When the block was sealed.
    pub sealed_at: Timestamp,
    /// Number of log entries recorded in this block.
    pub event_count: usize,
}

/// Prior value of one ledger entry, recorded before a write.
#[derive(Debug, Clone)]
enum Undo {
    Native {
        holder: Address,
        previous: Option<Amount>,
    },
    Asset {
        token: Address,
        previous: Option<Box<dyn FungibleAsset>>,
    },
    Code {
        address: Address,
    },
    Deployments {
        creator: Address,
        previous: Option<u64>,
    },
}

/// Position a [`Ledger`] can be rolled back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    log_len: usize,
}

/// The host ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    blocks: Vec<BlockHeader>,
    native: BTreeMap<Address, Amount>,
    assets: BTreeMap<Address, Box<dyn FungibleAsset>>,
    code: BTreeMap<Address, CodeKind>,
    deployments: BTreeMap<Address, u64>,
    log: Vec<LogEntry>,
    /// Log length when the last block was sealed.
    sealed_len: usize,
    journal: Option<Vec<Undo>>,
}

impl Ledger {
    /// An empty ledger with no sealed blocks.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Number of sealed blocks.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Number of the block currently under construction.
    pub fn pending_block(&self) -> u64 {
        self.height() + 1
    }

    /// All sealed block headers, oldest first.
    pub fn blocks(&self) -> &[BlockHeader] {
        &self.blocks
    }

    /// Close the pending block, keeping every write since the last
    /// checkpoint.
    pub fn seal_block(&mut self) -> &BlockHeader {
        let number = self.pending_block();
        let event_count = self.log.len() - self.sealed_len;
        self.sealed_len = self.log.len();
        self.journal = None;
        self.blocks.push(BlockHeader {
            number,
            sealed_at: Timestamp::now(),
            event_count,
        });
        tracing::trace!(block = number, event_count, "sealed block");
        &self.blocks[self.blocks.len() - 1]
    }

    // ── Journal ─────────────────────────────────────────────────────────

    /// Start recording undo information for the pending block.
    ///
    /// Opening a new checkpoint discards any journal left open without a
    /// seal or rollback.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.journal = Some(Vec::new());
        Checkpoint {
            log_len: self.log.len(),
        }
    }

    /// Undo every write made since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let journal = self.journal.take().unwrap_or_default();
        let undone = journal.len();
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Native { holder, previous } => restore(&mut self.native, holder, previous),
                Undo::Asset { token, previous } => restore(&mut self.assets, token, previous),
                Undo::Code { address } => {
                    self.code.remove(&address);
                }
                Undo::Deployments { creator, previous } => {
                    restore(&mut self.deployments, creator, previous)
                }
            }
        }
        self.log.truncate(checkpoint.log_len.max(self.sealed_len));
        tracing::trace!(undone, log_len = self.log.len(), "ledger rolled back");
    }

    fn record(&mut self, undo: impl FnOnce(&Self) -> Undo) {
        if self.journal.is_some() {
            let entry = undo(self);
            if let Some(journal) = self.journal.as_mut() {
                journal.push(entry);
            }
        }
    }

    fn set_native(&mut self, holder: Address, amount: Amount) {
        self.record(|l| Undo::Native {
            holder,
            previous: l.native.get(&holder).copied(),
        });
        self.native.insert(holder, amount);
    }

    // ── Event log ───────────────────────────────────────────────────────

    /// Append an event to the pending block.
    pub fn emit(&mut self, emitter: Address, event: Event) {
        let block = self.pending_block();
        self.log.push(LogEntry {
            block,
            emitter,
            event,
        });
    }

    /// The complete log, oldest first.
    pub fn events(&self) -> &[LogEntry] {
        &self.log
    }

    /// Log entries recorded in block `block` or later.
    pub fn events_since(&self, block: u64) -> impl Iterator<Item = &LogEntry> {
        let start = self.log.partition_point(|e| e.block < block);
        self.log[start..].iter()
    }

    // ── Code registry ───────────────────────────────────────────────────

    /// Allocate a fresh contract address for `creator` and register its code kind.
    pub fn allocate_address(&mut self, creator: &Address, kind: CodeKind) -> Address {
        let creator = *creator;
        let previous = self.deployments.get(&creator).copied();
        let mut sequence = previous.unwrap_or(0);
        let mut address = Address::derive(&creator, sequence);
        sequence += 1;
        while address.is_null() || self.code.contains_key(&address) {
            address = Address::derive(&creator, sequence);
            sequence += 1;
        }
        self.record(|_| Undo::Deployments { creator, previous });
        self.deployments.insert(creator, sequence);
        self.record(|_| Undo::Code { address });
        self.code.insert(address, kind);
        address
    }

    /// The kind of contract at `address`, if any.
    pub fn code_at(&self, address: &Address) -> Option<CodeKind> {
        self.code.get(address).copied()
    }

    // ── Native currency ─────────────────────────────────────────────────

    /// Native balance of `holder`.
    pub fn native_balance(&self, holder: &Address) -> Amount {
        self.native.get(holder).copied().unwrap_or_default()
    }

    /// Mint native currency to `holder`. Genesis only.
    pub fn fund(&mut self, holder: Address, amount: Amount) -> Result<(), LedgerError> {
        let credited = self
            .native_balance(&holder)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                token: Address::NULL,
                holder,
            })?;
        self.set_native(holder, credited);
        Ok(())
    }

    /// Move native currency. Receipt is unconditional for any `to`.
    pub fn transfer_native(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.native_balance(from);
        let debited = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                token: Address::NULL,
                holder: *from,
                requested: amount,
                available,
            })?;
        if from != to {
            let credited = self
                .native_balance(to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow {
                    token: Address::NULL,
                    holder: *to,
                })?;
            self.set_native(*from, debited);
            self.set_native(*to, credited);
        }
        self.emit(
            *from,
            Event::NativeTransfer {
                from: *from,
                to: *to,
                amount,
            },
        );
        Ok(())
    }

    // ── Collaborator assets ─────────────────────────────────────────────

    /// Deploy a [`StandardToken`] minting `supply` to `deployer`.
    pub fn deploy_asset(
        &mut self,
        deployer: &Address,
        name: &str,
        symbol: &str,
        supply: Amount,
    ) -> Address {
        self.install_asset(
            deployer,
            supply,
            Box::new(StandardToken::new(name, symbol, *deployer, supply)),
        )
    }

    /// Deploy an arbitrary asset implementation.
    pub fn install_asset(
        &mut self,
        deployer: &Address,
        supply: Amount,
        asset: Box<dyn FungibleAsset>,
    ) -> Address {
        let token = self.allocate_address(deployer, CodeKind::Asset);
        let symbol = asset.symbol().to_string();
        self.record(|l| Undo::Asset {
            token,
            previous: l.assets.get(&token).cloned(),
        });
        self.assets.insert(token, asset);
        self.emit(
            token,
            Event::AssetDeployed {
                token,
                deployer: *deployer,
                symbol,
                supply,
            },
        );
        token
    }

    /// The asset deployed at `token`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CallFailed`] if `token` does not implement the asset
    /// interface.
    pub fn asset(&self, token: &Address) -> Result<&dyn FungibleAsset, LedgerError> {
        self.assets
            .get(token)
            .map(|a| a.as_ref())
            .ok_or(LedgerError::CallFailed { target: *token })
    }

    /// `balanceOf(holder)` on the asset at `token`.
    pub fn asset_balance_of(&self, token: &Address, holder: &Address) -> Result<Amount, LedgerError> {
        Ok(self.asset(token)?.balance_of(holder))
    }

    /// `transfer(to, amount)` on the asset at `token`, sent by `from`.
    pub fn asset_transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let previous = self
            .assets
            .get(token)
            .ok_or(LedgerError::CallFailed { target: *token })?;
        // The first copy taken in a journal is the one rollback restores.
        let undo = self
            .journal
            .as_ref()
            .filter(|j| !j.iter().any(|u| matches!(u, Undo::Asset { token: t, .. } if t == token)))
            .map(|_| Undo::Asset {
                token: *token,
                previous: Some(previous.clone()),
            });
        let asset = self
            .assets
            .get_mut(token)
            .ok_or(LedgerError::CallFailed { target: *token })?;
        asset.transfer(from, to, amount).map_err(|e| match e {
            TransferError::Insufficient { available } => LedgerError::InsufficientBalance {
                token: *token,
                holder: *from,
                requested: amount,
                available,
            },
            TransferError::Overflow => LedgerError::Overflow {
                token: *token,
                holder: *to,
            },
            TransferError::Rejected(reason) => {
                tracing::debug!(%token, %reason, "asset rejected transfer");
                LedgerError::CallFailed { target: *token }
            }
        })?;
        if let (Some(undo), Some(journal)) = (undo, self.journal.as_mut()) {
            journal.push(undo);
        }
        self.emit(
            *token,
            Event::Transfer {
                token: *token,
                from: *from,
                to: *to,
                amount,
            },
        );
        Ok(())
    }
}

fn restore<V>(map: &mut BTreeMap<Address, V>, key: Address, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}
