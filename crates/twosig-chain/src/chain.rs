//! # Chain Runtime
//!
//! A [`Chain`] is a cloneable handle to one [`World`]: the ledger plus the
//! escrows and factories deployed on it. Every mutating call is a
//! transaction. It runs under the world's single lock, either commits and
//! seals a block, or reverts to the exact pre-call world.
//!
//! Reverting does not copy the world. The ledger keeps its own undo
//! journal, and the world saves the prior value of each escrow or factory
//! entry the first time a transaction touches it.
//!
//! ## Security Invariant
//!
//! Read-validate-update happens inside one critical section. Two callers
//! presenting the same nonce are serialized, so exactly one consumes it
//! and the other sees `Wrong nonce`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use twosig_core::{Address, Amount, LogEntry};
use twosig_escrow::{Escrow, EscrowError, EscrowFactory, EscrowSnapshot, Proposal, QuorumConfig};
use twosig_ledger::{BlockHeader, Checkpoint, CodeKind, Ledger};

use crate::config::{ChainConfig, ConfigError};
use crate::error::ChainError;

/// Prior value of a contract entry, saved before its first write.
#[derive(Debug, Clone)]
enum Saved {
    Escrow(Address, Option<Escrow>),
    Factory(Address, Option<EscrowFactory>),
}

/// Everything a transaction can touch.
#[derive(Debug, Clone, Default)]
pub struct World {
    ledger: Ledger,
    escrows: BTreeMap<Address, Escrow>,
    factories: BTreeMap<Address, EscrowFactory>,
    saved: Vec<Saved>,
}

impl World {
    /// The host ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The escrow at `address`.
    pub fn escrow(&self, address: &Address) -> Result<&Escrow, ChainError> {
        self.escrows.get(address).ok_or(ChainError::UnknownContract {
            address: *address,
            expected: CodeKind::Escrow,
        })
    }

    /// The factory at `address`.
    pub fn factory(&self, address: &Address) -> Result<&EscrowFactory, ChainError> {
        self.factories.get(address).ok_or(ChainError::UnknownContract {
            address: *address,
            expected: CodeKind::Factory,
        })
    }

    /// Addresses of every escrow, in address order.
    pub fn escrow_addresses(&self) -> impl Iterator<Item = &Address> {
        self.escrows.keys()
    }

    /// Call into the escrow at `address` with mutable access to the ledger.
    pub fn with_escrow<R>(
        &mut self,
        address: &Address,
        f: impl FnOnce(&mut Escrow, &mut Ledger) -> Result<R, EscrowError>,
    ) -> Result<R, ChainError> {
        let current = self.escrow(address)?.clone();
        self.save_escrow(*address, Some(current));
        let escrow = self
            .escrows
            .get_mut(address)
            .ok_or(ChainError::UnknownContract {
                address: *address,
                expected: CodeKind::Escrow,
            })?;
        Ok(f(escrow, &mut self.ledger)?)
    }

    fn insert_escrow(&mut self, escrow: Escrow) -> Address {
        let address = escrow.address();
        let previous = self.escrows.get(&address).cloned();
        self.save_escrow(address, previous);
        self.escrows.insert(address, escrow);
        address
    }

    fn insert_factory(&mut self, factory: EscrowFactory) -> Address {
        let address = factory.address();
        let saved = self
            .saved
            .iter()
            .any(|s| matches!(s, Saved::Factory(a, _) if *a == address));
        if !saved {
            let previous = self.factories.get(&address).cloned();
            self.saved.push(Saved::Factory(address, previous));
        }
        self.factories.insert(address, factory);
        address
    }

    fn save_escrow(&mut self, address: Address, previous: Option<Escrow>) {
        let saved = self
            .saved
            .iter()
            .any(|s| matches!(s, Saved::Escrow(a, _) if *a == address));
        if !saved {
            self.saved.push(Saved::Escrow(address, previous));
        }
    }

    fn begin(&mut self) -> Checkpoint {
        self.saved.clear();
        self.ledger.checkpoint()
    }

    fn commit(&mut self) -> &BlockHeader {
        self.saved.clear();
        self.ledger.seal_block()
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        for saved in self.saved.drain(..).rev() {
            match saved {
                Saved::Escrow(address, Some(escrow)) => {
                    self.escrows.insert(address, escrow);
                }
                Saved::Escrow(address, None) => {
                    self.escrows.remove(&address);
                }
                Saved::Factory(address, Some(factory)) => {
                    self.factories.insert(address, factory);
                }
                Saved::Factory(address, None) => {
                    self.factories.remove(&address);
                }
            }
        }
        self.ledger.rollback(checkpoint);
    }
}

/// Shared handle to a running chain.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    world: Arc<Mutex<World>>,
    nonce_seed: u64,
}

impl Chain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain with genesis balances and nonce seed from `config`.
    pub fn from_config(config: &ChainConfig) -> Result<Self, ConfigError> {
        let mut world = World::default();
        for (account, balance) in config.genesis_balances()? {
            world
                .ledger
                .fund(account, balance)
                .map_err(|e| ConfigError::InvalidAccount {
                    account: account.to_string(),
                    reason: e.to_string(),
                })?;
        }
        tracing::debug!(
            accounts = config.genesis.len(),
            nonce_seed = config.nonce_seed,
            "genesis applied"
        );
        Ok(Self {
            world: Arc::new(Mutex::new(world)),
            nonce_seed: config.nonce_seed,
        })
    }

    /// Run `f` as one atomic transaction.
    ///
    /// On success the pending block is sealed. On error the world is
    /// restored to its state before `f` ran, events included.
    pub fn transact<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut World) -> Result<R, ChainError>,
    ) -> Result<R, ChainError> {
        let mut world = self.world.lock();
        let checkpoint = world.begin();
        match f(&mut *world) {
            Ok(value) => {
                let header = world.commit();
                tracing::debug!(op, block = header.number, events = header.event_count, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                world.rollback(checkpoint);
                tracing::debug!(op, kind = %e.kind(), error = %e, "transaction reverted");
                Err(e)
            }
        }
    }

    /// Run `f` against a consistent view of the world.
    pub fn read<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&*self.world.lock())
    }

    // ── Deployment ──────────────────────────────────────────────────────

    /// Deploy a standard token minting `supply` to `deployer`.
    pub fn deploy_asset(
        &self,
        deployer: &Address,
        name: &str,
        symbol: &str,
        supply: Amount,
    ) -> Result<Address, ChainError> {
        self.transact("deploy_asset", |w| {
            Ok(w.ledger.deploy_asset(deployer, name, symbol, supply))
        })
    }

    /// Deploy an escrow directly, `deployer` as controller.
    pub fn deploy_escrow(
        &self,
        deployer: &Address,
        signer_count: u8,
        quorum: u8,
    ) -> Result<Address, ChainError> {
        let config = QuorumConfig {
            signer_count,
            quorum,
            nonce_seed: self.nonce_seed,
        };
        self.transact("deploy_escrow", |w| {
            let escrow = Escrow::deploy(&mut w.ledger, deployer, config)?;
            Ok(w.insert_escrow(escrow))
        })
    }

    /// Deploy a factory bound to the escrow at `implementation`.
    pub fn deploy_factory(
        &self,
        deployer: &Address,
        implementation: &Address,
    ) -> Result<Address, ChainError> {
        self.transact("deploy_factory", |w| {
            let reference = w.escrows.get(implementation).ok_or(ChainError::UnknownContract {
                address: *implementation,
                expected: CodeKind::Escrow,
            })?;
            let factory = EscrowFactory::deploy(&mut w.ledger, deployer, reference);
            Ok(w.insert_factory(factory))
        })
    }

    /// `createEscrow` on the factory at `factory`, called by `caller`.
    pub fn create_escrow(
        &self,
        factory: &Address,
        caller: &Address,
        signer_count: u8,
        quorum: u8,
    ) -> Result<Address, ChainError> {
        self.transact("create_escrow", |w| {
            let factory = w.factories.get(factory).ok_or(ChainError::UnknownContract {
                address: *factory,
                expected: CodeKind::Factory,
            })?;
            let implementation = factory.implementation();
            let reference = w.escrows.get(&implementation).ok_or(ChainError::UnknownContract {
                address: implementation,
                expected: CodeKind::Escrow,
            })?;
            let escrow =
                factory.create_escrow(&mut w.ledger, reference, caller, signer_count, quorum)?;
            Ok(w.insert_escrow(escrow))
        })
    }

    // ── Value movement ──────────────────────────────────────────────────

    /// Send native currency. Deposits into an escrow are just this.
    pub fn send_native(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), ChainError> {
        self.transact("send_native", |w| Ok(w.ledger.transfer_native(from, to, amount)?))
    }

    /// `transfer` on the asset at `token`, sent by `from`.
    pub fn transfer_asset(
        &self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ChainError> {
        self.transact("transfer_asset", |w| {
            Ok(w.ledger.asset_transfer(token, from, to, amount)?)
        })
    }

    // ── Escrow calls ────────────────────────────────────────────────────

    /// `setSigner`.
    pub fn set_signer(
        &self,
        escrow: &Address,
        caller: &Address,
        index: u8,
        signer: Address,
    ) -> Result<(), ChainError> {
        self.transact("set_signer", |w| {
            w.with_escrow(escrow, |e, l| e.set_signer(l, caller, index, signer))
        })
    }

    /// `proposeWithdrawl`. A null `token` means native currency.
    pub fn propose_withdrawal(
        &self,
        escrow: &Address,
        caller: &Address,
        nonce: u64,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<(), ChainError> {
        self.transact("propose_withdrawal", |w| {
            w.with_escrow(escrow, |e, l| {
                e.propose_withdrawal(l, caller, nonce, token, receiver, amount)
            })
        })
    }

    /// `signProposal`.
    pub fn sign_proposal(
        &self,
        escrow: &Address,
        caller: &Address,
        nonce: u64,
        approve: bool,
    ) -> Result<(), ChainError> {
        self.transact("sign_proposal", |w| {
            w.with_escrow(escrow, |e, l| e.sign_proposal(l, caller, nonce, approve))
        })
    }

    /// `signProposalIndexed`.
    pub fn sign_proposal_indexed(
        &self,
        escrow: &Address,
        caller: &Address,
        nonce: u64,
        index: u8,
        approve: bool,
    ) -> Result<(), ChainError> {
        self.transact("sign_proposal_indexed", |w| {
            w.with_escrow(escrow, |e, l| {
                e.sign_proposal_indexed(l, caller, nonce, index, approve)
            })
        })
    }

    /// `executeProposal`.
    pub fn execute_proposal(&self, escrow: &Address, caller: &Address) -> Result<Proposal, ChainError> {
        self.transact("execute_proposal", |w| {
            w.with_escrow(escrow, |e, l| e.execute_proposal(l, caller))
        })
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Controller of an escrow (null once primed).
    pub fn controller(&self, escrow: &Address) -> Result<Address, ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.controller()))
    }

    /// Signers of an escrow.
    pub fn signers(&self, escrow: &Address) -> Result<[Address; 2], ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.signers()))
    }

    /// Current nonce of an escrow.
    pub fn nonce(&self, escrow: &Address) -> Result<u64, ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.nonce()))
    }

    /// Outstanding proposal of an escrow.
    pub fn active_proposal(&self, escrow: &Address) -> Result<Proposal, ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.active_proposal()))
    }

    /// `depositsOf(token)` on an escrow.
    pub fn deposits_of(&self, escrow: &Address, token: &Address) -> Result<Amount, ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.deposits_of(&w.ledger, token)?))
    }

    /// Report view of an escrow.
    pub fn escrow_snapshot(&self, escrow: &Address) -> Result<EscrowSnapshot, ChainError> {
        self.read(|w| Ok(w.escrow(escrow)?.snapshot()))
    }

    /// Native balance of any address.
    pub fn native_balance(&self, holder: &Address) -> Amount {
        self.read(|w| w.ledger.native_balance(holder))
    }

    /// Asset balance of any address.
    pub fn asset_balance(&self, token: &Address, holder: &Address) -> Result<Amount, ChainError> {
        self.read(|w| Ok(w.ledger.asset_balance_of(token, holder)?))
    }

    /// The full event log.
    pub fn events(&self) -> Vec<LogEntry> {
        self.read(|w| w.ledger.events().to_vec())
    }

    /// Number of sealed blocks.
    pub fn block_height(&self) -> u64 {
        self.read(|w| w.ledger.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twosig_core::Event;
    use twosig_escrow::ErrorKind;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn primed_chain() -> (Chain, Address) {
        let config = ChainConfig::from_yaml_str("genesis:\n  - account: depositor\n    balance: 100\n").unwrap();
        let chain = Chain::from_config(&config).unwrap();
        let owner = addr("owner");
        let escrow = chain.deploy_escrow(&owner, 2, 2).unwrap();
        chain.set_signer(&escrow, &owner, 0, addr("alice")).unwrap();
        chain.set_signer(&escrow, &owner, 1, addr("bob")).unwrap();
        (chain, escrow)
    }

    #[test]
    fn each_commit_seals_a_block() {
        let (chain, _) = primed_chain();
        assert_eq!(chain.block_height(), 3);
        let blocks: Vec<u64> = chain.events().iter().map(|e| e.block).collect();
        assert_eq!(blocks, [1, 2, 3, 3]);
    }

    #[test]
    fn revert_restores_world_and_log() {
        let (chain, escrow) = primed_chain();
        let events = chain.events().len();
        let err = chain
            .propose_withdrawal(&escrow, &addr("alice"), 0, Address::NULL, addr("carol"), Amount::new(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(chain.events().len(), events);
        assert_eq!(chain.nonce(&escrow).unwrap(), 0);
        assert_eq!(chain.block_height(), 3);
    }

    #[test]
    fn multi_call_transaction_is_all_or_nothing() {
        let (chain, escrow) = primed_chain();
        chain.send_native(&addr("depositor"), &escrow, Amount::new(10)).unwrap();
        let (alice, bob) = (addr("alice"), addr("bob"));
        let result = chain.transact("batch", |w| {
            w.with_escrow(&escrow, |e, l| {
                e.propose_withdrawal(l, &alice, 0, Address::NULL, addr("carol"), Amount::new(10))
            })?;
            w.with_escrow(&escrow, |e, l| e.sign_proposal(l, &bob, 0, true))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Nonce);
        assert_eq!(chain.active_proposal(&escrow).unwrap(), Proposal::EMPTY);
        assert_eq!(chain.nonce(&escrow).unwrap(), 0);
    }

    #[test]
    fn reverted_deployments_leave_no_contract_behind() {
        let chain = Chain::new();
        let deployer = addr("deployer");
        let reference = chain.deploy_escrow(&deployer, 2, 2).unwrap();
        let mut deployed = Address::NULL;
        let result = chain.transact("batch", |w| {
            let escrow = Escrow::deploy(&mut w.ledger, &deployer, QuorumConfig::TWO_OF_TWO)?;
            deployed = w.insert_escrow(escrow);
            let template = w.escrow(&reference)?.clone();
            let factory = EscrowFactory::deploy(&mut w.ledger, &deployer, &template);
            w.insert_factory(factory);
            w.with_escrow(&reference, |e, l| e.set_signer(l, &addr("mallory"), 0, addr("a")))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);
        assert!(chain.read(|w| w.escrow(&deployed).is_err()));
        assert_eq!(chain.read(|w| w.ledger().code_at(&deployed)), None);
        assert_eq!(chain.read(|w| w.factories.len()), 0);

        // The next deployment reuses the address the reverted one was given.
        assert_eq!(chain.deploy_escrow(&deployer, 2, 2).unwrap(), deployed);
    }

    #[test]
    fn revert_after_long_history_keeps_earlier_blocks() {
        let (chain, escrow) = primed_chain();
        for _ in 0..500 {
            chain.send_native(&addr("depositor"), &escrow, Amount::new(0)).unwrap();
        }
        let height = chain.block_height();
        let events = chain.events().len();
        chain.send_native(&addr("depositor"), &escrow, Amount::new(30)).unwrap();
        assert!(chain
            .send_native(&addr("depositor"), &escrow, Amount::new(71))
            .is_err());
        assert_eq!(chain.block_height(), height + 1);
        assert_eq!(chain.events().len(), events + 1);
        assert_eq!(chain.native_balance(&escrow), Amount::new(30));
        let sealed = chain.read(|w| w.ledger().blocks().to_vec());
        assert!(sealed.iter().all(|b| b.event_count <= 2));
    }

    #[test]
    fn nonce_seed_from_config_applies_to_direct_deployments() {
        let config = ChainConfig {
            nonce_seed: 12,
            genesis: Vec::new(),
        };
        let chain = Chain::from_config(&config).unwrap();
        let escrow = chain.deploy_escrow(&addr("owner"), 2, 2).unwrap();
        assert_eq!(chain.nonce(&escrow).unwrap(), 12);
    }

    #[test]
    fn calls_to_missing_contracts_are_rejected() {
        let chain = Chain::new();
        let nowhere = addr("nowhere");
        let err = chain.set_signer(&nowhere, &addr("owner"), 0, addr("a")).unwrap_err();
        assert_eq!(
            err,
            ChainError::UnknownContract {
                address: nowhere,
                expected: CodeKind::Escrow
            }
        );
        assert!(chain.create_escrow(&nowhere, &addr("owner"), 2, 2).is_err());
        assert!(chain.deploy_factory(&addr("owner"), &nowhere).is_err());
    }

    #[test]
    fn factory_instances_are_tracked() {
        let chain = Chain::new();
        let deployer = addr("deployer");
        let reference = chain.deploy_escrow(&deployer, 2, 2).unwrap();
        let factory = chain.deploy_factory(&deployer, &reference).unwrap();
        let created = chain.create_escrow(&factory, &addr("tenant"), 2, 2).unwrap();
        assert_eq!(chain.controller(&created).unwrap(), addr("tenant"));
        assert!(chain.read(|w| w.escrow_addresses().count()) == 2);
        let last = chain.events().pop().unwrap();
        assert!(matches!(last.event, Event::EscrowCreated { escrow, .. } if escrow == created));
    }

    #[test]
    fn racing_callers_consume_a_nonce_once() {
        let (chain, escrow) = primed_chain();
        chain.send_native(&addr("depositor"), &escrow, Amount::new(10)).unwrap();
        let handles: Vec<_> = ["alice", "bob"]
            .into_iter()
            .map(|who| {
                let chain = chain.clone();
                std::thread::spawn(move || {
                    chain.propose_withdrawal(
                        &escrow,
                        &addr(who),
                        0,
                        Address::NULL,
                        addr("carol"),
                        Amount::new(1),
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.into_iter().find_map(Result::err).unwrap();
        assert_eq!(loser.kind(), ErrorKind::Nonce);
        assert_eq!(chain.nonce(&escrow).unwrap(), 1);
    }
}
