//! # Escrow Factory
//!
//! Bound at deployment to a reference escrow. Each [`EscrowFactory::create_escrow`]
//! call yields an independent, unprimed escrow at a fresh address with the
//! caller as controller. Instances share only the reference's
//! configuration; signers, nonce and proposal start from scratch.

use serde::Serialize;
use twosig_core::{Address, Event};
use twosig_ledger::{CodeKind, Ledger};

use crate::config::QuorumConfig;
use crate::error::EscrowError;
use crate::escrow::Escrow;

/// Creates escrows from a reference implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscrowFactory {
    address: Address,
    implementation: Address,
}

impl EscrowFactory {
    /// Deploy a factory bound to `implementation`.
    pub fn deploy(ledger: &mut Ledger, deployer: &Address, implementation: &Escrow) -> Self {
        let address = ledger.allocate_address(deployer, CodeKind::Factory);
        let implementation = implementation.address();
        ledger.emit(
            address,
            Event::FactoryDeployed {
                factory: address,
                implementation,
            },
        );
        tracing::info!(factory = %address, %implementation, "factory deployed");
        Self {
            address,
            implementation,
        }
    }

    /// Factory address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The reference escrow this factory instantiates.
    pub fn implementation(&self) -> Address {
        self.implementation
    }

    /// Create an escrow controlled by `caller`.
    ///
    /// `reference` must be the escrow this factory is bound to. Only
    /// `signer_count == 2, quorum == 2` is accepted.
    pub fn create_escrow(
        &self,
        ledger: &mut Ledger,
        reference: &Escrow,
        caller: &Address,
        signer_count: u8,
        quorum: u8,
    ) -> Result<Escrow, EscrowError> {
        if reference.address() != self.implementation {
            return Err(EscrowError::ImplementationMismatch {
                expected: self.implementation,
                found: reference.address(),
            });
        }
        QuorumConfig::new(signer_count, quorum)?;

        let address = ledger.allocate_address(&self.address, CodeKind::Escrow);
        let escrow = reference.instantiate(address, *caller);
        ledger.emit(
            self.address,
            Event::EscrowCreated {
                escrow: address,
                controller: *caller,
            },
        );
        tracing::info!(factory = %self.address, escrow = %address, controller = %caller, "escrow created");
        Ok(escrow)
    }
}
