//! # Ledger Events
//!
//! Notifications recorded in the ledger's append-only log. Off-chain
//! observers discover factory-created escrows through `EscrowCreated`,
//! track priming through `Primed`, and follow completed withdrawals through
//! `ProposalExecuted`.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;

/// A notification emitted by a contract or by the ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Native currency moved between two addresses.
    NativeTransfer {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Units moved.
        amount: Amount,
    },

    /// Asset units moved between two holders.
    Transfer {
        /// The asset contract.
        token: Address,
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Units moved.
        amount: Amount,
    },

    /// A collaborator asset was deployed and its supply minted.
    AssetDeployed {
        /// The new asset contract.
        token: Address,
        /// Receives the whole initial supply.
        deployer: Address,
        /// Ticker symbol.
        symbol: String,
        /// Initial supply.
        supply: Amount,
    },

    /// An escrow was deployed directly (not through a factory).
    EscrowDeployed {
        /// The new escrow.
        escrow: Address,
        /// Its initial controller.
        controller: Address,
    },

    /// A factory was deployed and bound to a reference escrow.
    FactoryDeployed {
        /// The new factory.
        factory: Address,
        /// The reference escrow it instantiates.
        implementation: Address,
    },

    /// The controller assigned a signer slot.
    SignerAssigned {
        /// Slot index (0 or 1).
        index: u8,
        /// The assigned signer, or the null address when the slot was cleared.
        signer: Address,
    },

    /// Both signer slots are filled; the controller is gone for good.
    Primed {
        /// The final signer pair.
        signers: [Address; 2],
    },

    /// A signer replaced the active proposal.
    WithdrawalProposed {
        /// The nonce the proposal consumed.
        nonce: u64,
        /// The proposing signer.
        proposer: Address,
        /// Token to withdraw (null for native currency).
        token: Address,
        /// Recipient of the withdrawal.
        receiver: Address,
        /// Units to withdraw.
        amount: Amount,
    },

    /// A signer set or retracted their approval flag.
    ProposalSigned {
        /// The nonce the signature consumed.
        nonce: u64,
        /// The signing party.
        signer: Address,
        /// The signer's slot.
        index: u8,
        /// The new value of the approval flag.
        approve: bool,
    },

    /// A fully approved proposal was carried out and cleared.
    ProposalExecuted {
        /// Whoever submitted the execution.
        executor: Address,
        /// Token withdrawn (null for native currency).
        token: Address,
        /// Recipient of the withdrawal.
        receiver: Address,
        /// Units withdrawn.
        amount: Amount,
    },

    /// A factory stamped out a new escrow instance.
    EscrowCreated {
        /// The new escrow's address.
        escrow: Address,
        /// Its controller (the caller of the factory).
        controller: Address,
    },
}

impl Event {
    /// Stable snake_case event name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NativeTransfer { .. } => "native_transfer",
            Self::Transfer { .. } => "transfer",
            Self::AssetDeployed { .. } => "asset_deployed",
            Self::EscrowDeployed { .. } => "escrow_deployed",
            Self::FactoryDeployed { .. } => "factory_deployed",
            Self::SignerAssigned { .. } => "signer_assigned",
            Self::Primed { .. } => "primed",
            Self::WithdrawalProposed { .. } => "withdrawal_proposed",
            Self::ProposalSigned { .. } => "proposal_signed",
            Self::ProposalExecuted { .. } => "proposal_executed",
            Self::EscrowCreated { .. } => "escrow_created",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An event as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Block the event was recorded in.
    pub block: u64,
    /// Address of the emitting contract (or sender, for native transfers).
    pub emitter: Address,
    /// The event payload.
    pub event: Event,
}
