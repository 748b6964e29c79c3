//! # Two-Party Escrow
//!
//! Holds native currency and collaborator assets on behalf of two signers.
//! Funds leave only through a withdrawal proposal that both signers
//! approved.
//!
//! ## Lifecycle
//!
//! 1. The deployer becomes controller and fills the two signer slots with
//!    [`Escrow::set_signer`]. Filling the second slot primes the escrow.
//! 2. A signer proposes a withdrawal ([`Escrow::propose_withdrawal`]),
//!    replacing any earlier proposal and clearing all approvals.
//! 3. Each signer approves ([`Escrow::sign_proposal`] or
//!    [`Escrow::sign_proposal_indexed`]).
//! 4. Anyone executes ([`Escrow::execute_proposal`]) once both approved.
//!
//! ## Security Invariant
//!
//! Every propose and sign call must present the current nonce and consumes
//! it on success. A signed message therefore authorizes exactly one action
//! and cannot be replayed or reordered. The nonce only moves forward.
//!
//! Balances are never tracked here. The escrow reads its holdings from the
//! ledger at the moment of the call, so deposits need no cooperation from
//! the escrow.

use serde::{Deserialize, Serialize};
use twosig_core::{Address, Amount, Event};
use twosig_ledger::{CodeKind, Ledger};

use crate::config::{QuorumConfig, REQUIRED_APPROVALS};
use crate::error::EscrowError;
use crate::phase::{Assignment, Phase};
use crate::proposal::Proposal;

/// A two-party multisig escrow.
///
/// Serializable for reports only. An escrow comes into being through
/// [`Escrow::deploy`] or a factory, never from external data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Escrow {
    address: Address,
    config: QuorumConfig,
    phase: Phase,
    nonce: u64,
    proposal: Option<Proposal>,
}

/// Read-only view of an escrow, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    /// Escrow address.
    pub address: Address,
    /// `"UNPRIMED"` or `"PRIMED"`.
    pub phase: String,
    /// Controller, null once primed.
    pub controller: Address,
    /// Signer per slot.
    pub signers: [Address; 2],
    /// Current nonce.
    pub nonce: u64,
    /// Current proposal, [`Proposal::EMPTY`] when none.
    pub proposal: Proposal,
}

impl Escrow {
    /// Deploy a new escrow with `deployer` as controller.
    pub fn deploy(
        ledger: &mut Ledger,
        deployer: &Address,
        config: QuorumConfig,
    ) -> Result<Self, EscrowError> {
        config.validate()?;
        let address = ledger.allocate_address(deployer, CodeKind::Escrow);
        ledger.emit(
            address,
            Event::EscrowDeployed {
                escrow: address,
                controller: *deployer,
            },
        );
        tracing::info!(%address, controller = %deployer, "escrow deployed");
        Ok(Self::initialize(address, *deployer, config))
    }

    fn initialize(address: Address, controller: Address, config: QuorumConfig) -> Self {
        Self {
            address,
            config,
            phase: Phase::unprimed(controller),
            nonce: config.nonce_seed,
            proposal: None,
        }
    }

    /// A fresh, unprimed escrow at `address` sharing this escrow's
    /// configuration. Runtime state (signers, nonce, proposal) is not copied.
    pub(crate) fn instantiate(&self, address: Address, controller: Address) -> Self {
        Self::initialize(address, controller, self.config)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Escrow address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Deployment configuration.
    pub fn config(&self) -> &QuorumConfig {
        &self.config
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Controller, or the null address once primed.
    pub fn controller(&self) -> Address {
        self.phase.controller()
    }

    /// Signer per slot; unassigned slots read as null.
    ///
    /// Before priming these are pending assignments only: the addresses
    /// listed cannot propose or sign until both slots are filled. See
    /// [`Escrow::is_signer`].
    pub fn signers(&self) -> [Address; 2] {
        self.phase.signers()
    }

    /// Whether `who` currently holds signer rights (primed escrows only).
    pub fn is_signer(&self, who: &Address) -> bool {
        self.phase.slot_of(who).is_some()
    }

    /// Whether the signer pair is frozen.
    pub fn is_primed(&self) -> bool {
        self.phase.is_primed()
    }

    /// The nonce the next propose or sign call must present.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The outstanding proposal, or [`Proposal::EMPTY`].
    pub fn active_proposal(&self) -> Proposal {
        self.proposal.unwrap_or(Proposal::EMPTY)
    }

    /// Live holdings of `token` (null for native currency).
    ///
    /// # Errors
    ///
    /// [`EscrowError::Ledger`] with `CallFailed` if `token` is not an asset.
    pub fn deposits_of(&self, ledger: &Ledger, token: &Address) -> Result<Amount, EscrowError> {
        if token.is_null() {
            Ok(ledger.native_balance(&self.address))
        } else {
            Ok(ledger.asset_balance_of(token, &self.address)?)
        }
    }

    /// Report view.
    pub fn snapshot(&self) -> EscrowSnapshot {
        EscrowSnapshot {
            address: self.address,
            phase: self.phase.name().to_string(),
            controller: self.controller(),
            signers: self.signers(),
            nonce: self.nonce,
            proposal: self.active_proposal(),
        }
    }

    // ── Priming ─────────────────────────────────────────────────────────

    /// Assign `signer` to slot `index`. Controller only, unprimed only.
    pub fn set_signer(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
        index: u8,
        signer: Address,
    ) -> Result<(), EscrowError> {
        let outcome = self.phase.assign(caller, index, signer)?;
        ledger.emit(self.address, Event::SignerAssigned { index, signer });
        if let Assignment::Primed(signers) = outcome {
            ledger.emit(self.address, Event::Primed { signers });
            tracing::info!(
                escrow = %self.address,
                first = %signers[0],
                second = %signers[1],
                "escrow primed"
            );
        }
        Ok(())
    }

    // ── Proposals ───────────────────────────────────────────────────────

    /// Replace the outstanding proposal with a withdrawal of `amount` of
    /// `token` to `receiver`, clearing both approvals.
    ///
    /// Checks run in order: signer, nonce, receiver, holdings.
    pub fn propose_withdrawal(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
        nonce: u64,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        self.require_signer(caller)?;
        self.check_nonce(nonce)?;
        if receiver.is_null() {
            return Err(EscrowError::NullReceiver);
        }
        let available = self.deposits_of(ledger, &token)?;
        if amount > available {
            return Err(EscrowError::InsufficientDeposits {
                token,
                requested: amount,
                available,
            });
        }
        let next = self.next_nonce()?;

        self.proposal = Some(Proposal::new(token, receiver, amount));
        self.nonce = next;
        ledger.emit(
            self.address,
            Event::WithdrawalProposed {
                nonce,
                proposer: *caller,
                token,
                receiver,
                amount,
            },
        );
        tracing::debug!(escrow = %self.address, nonce, %token, %receiver, %amount, "withdrawal proposed");
        Ok(())
    }

    /// Set or clear the caller's approval on the outstanding proposal.
    pub fn sign_proposal(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
        nonce: u64,
        approve: bool,
    ) -> Result<(), EscrowError> {
        let slot = self.require_signer(caller)?;
        self.check_nonce(nonce)?;
        self.record_approval(ledger, caller, slot, nonce, approve)
    }

    /// As [`Escrow::sign_proposal`], with the caller naming its own slot.
    /// Naming the other signer's slot is an authorization failure.
    pub fn sign_proposal_indexed(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
        nonce: u64,
        index: u8,
        approve: bool,
    ) -> Result<(), EscrowError> {
        let slot = self.require_signer(caller)?;
        self.check_nonce(nonce)?;
        if index != slot {
            return Err(EscrowError::UnauthorizedIndex {
                caller: *caller,
                index,
            });
        }
        self.record_approval(ledger, caller, slot, nonce, approve)
    }

    fn record_approval(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
        slot: u8,
        nonce: u64,
        approve: bool,
    ) -> Result<(), EscrowError> {
        let Some(proposal) = self.proposal.as_mut() else {
            return Err(EscrowError::NoActiveProposal);
        };
        let next = self
            .nonce
            .checked_add(1)
            .ok_or(EscrowError::NonceExhausted)?;

        proposal.approvals[usize::from(slot)] = approve;
        self.nonce = next;
        ledger.emit(
            self.address,
            Event::ProposalSigned {
                nonce,
                signer: *caller,
                index: slot,
                approve,
            },
        );
        tracing::debug!(escrow = %self.address, nonce, index = slot, approve, "proposal signed");
        Ok(())
    }

    /// Send the outstanding withdrawal once both signers approved, then
    /// clear the proposal. Callable by anyone; does not consume a nonce.
    ///
    /// If the transfer fails nothing changes and the proposal stays.
    pub fn execute_proposal(
        &mut self,
        ledger: &mut Ledger,
        caller: &Address,
    ) -> Result<Proposal, EscrowError> {
        let proposal = self
            .proposal
            .filter(Proposal::is_active)
            .ok_or(EscrowError::NoActiveProposal)?;
        if !proposal.has_quorum() {
            return Err(EscrowError::QuorumNotReached {
                approvals: proposal.approval_count(),
                required: REQUIRED_APPROVALS,
            });
        }

        if proposal.is_native() {
            ledger.transfer_native(&self.address, &proposal.receiver, proposal.amount)?;
        } else {
            ledger.asset_transfer(
                &proposal.token,
                &self.address,
                &proposal.receiver,
                proposal.amount,
            )?;
        }

        self.proposal = None;
        ledger.emit(
            self.address,
            Event::ProposalExecuted {
                executor: *caller,
                token: proposal.token,
                receiver: proposal.receiver,
                amount: proposal.amount,
            },
        );
        tracing::info!(
            escrow = %self.address,
            token = %proposal.token,
            receiver = %proposal.receiver,
            amount = %proposal.amount,
            "withdrawal executed"
        );
        Ok(proposal)
    }

    // ── Guards ──────────────────────────────────────────────────────────

    fn require_signer(&self, caller: &Address) -> Result<u8, EscrowError> {
        self.phase
            .slot_of(caller)
            .ok_or(EscrowError::NotSigner { caller: *caller })
    }

    fn check_nonce(&self, presented: u64) -> Result<(), EscrowError> {
        if presented != self.nonce {
            return Err(EscrowError::WrongNonce {
                expected: self.nonce,
                presented,
            });
        }
        Ok(())
    }

    fn next_nonce(&self) -> Result<u64, EscrowError> {
        self.nonce.checked_add(1).ok_or(EscrowError::NonceExhausted)
    }
}
