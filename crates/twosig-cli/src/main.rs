//! # twosig CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use twosig_cli::deploy::{run_deploy, DeployArgs};
use twosig_cli::scenario::{run_check, run_scenario, CheckArgs, RunArgs};

/// Two-party multisig escrow toolkit.
///
/// Runs scripted escrow scenarios on an in-process chain and deploys
/// reference escrows with their factories.
#[derive(Parser, Debug)]
#[command(name = "twosig", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a chain configuration file (genesis balances, nonce seed).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a scenario file.
    Run(RunArgs),

    /// Parse and lint a scenario file without running it.
    Check(CheckArgs),

    /// Deploy a reference escrow and a factory bound to it.
    Deploy(DeployArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "twosig CLI starting");

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => run_scenario(&args, config),
        Commands::Check(args) => run_check(&args),
        Commands::Deploy(args) => run_deploy(&args, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
