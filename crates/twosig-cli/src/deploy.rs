//! # Deploy Subcommand
//!
//! Deploys the reference escrow and a factory bound to it on a fresh chain
//! and prints both addresses. The reference stays unprimed; users obtain
//! their own escrows through the factory.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use twosig_chain::{resolve_account, Chain, ChainConfig};
use twosig_core::Address;

/// Arguments for `twosig deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Deploying account: a label or a 0x-prefixed address.
    #[arg(long, default_value = "deployer")]
    pub deployer: String,
}

/// Addresses produced by a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// The reference escrow.
    pub escrow: Address,
    /// The factory bound to it.
    pub factory: Address,
}

/// Deploy the reference escrow and its factory on `chain`.
pub fn deploy(chain: &Chain, deployer: &Address) -> Result<Deployment> {
    let escrow = chain
        .deploy_escrow(deployer, 2, 2)
        .context("deploying reference escrow")?;
    let factory = chain
        .deploy_factory(deployer, &escrow)
        .context("deploying factory")?;
    Ok(Deployment { escrow, factory })
}

/// Execute `twosig deploy`.
pub fn run_deploy(args: &DeployArgs, config: Option<&Path>) -> Result<u8> {
    let config = crate::load_config(config)?.unwrap_or_default();
    let chain = Chain::from_config(&config).context("applying genesis")?;
    let deployer = resolve_account(&args.deployer)
        .with_context(|| format!("resolving deployer {:?}", args.deployer))?;

    let deployment = deploy(&chain, &deployer)?;
    tracing::info!(escrow = %deployment.escrow, factory = %deployment.factory, "deployment complete");
    println!("Escrow deployed to: {}", deployment.escrow);
    println!("Factory deployed to: {}", deployment.factory);
    Ok(0)
}
