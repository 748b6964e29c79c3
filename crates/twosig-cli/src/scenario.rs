//! # Run and Check Subcommands
//!
//! `run` executes a scenario and prints one line per named escrow, or the
//! whole report as JSON. `check` stops after parsing and linting.
//!
//! A `--config` file replaces the scenario's embedded `config:` block.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use twosig_chain::{Scenario, ScenarioReport};

/// Arguments for `twosig run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `twosig check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,
}

/// Execute `twosig run`.
///
/// A scenario whose steps do not behave as scripted is a failure (exit 1),
/// not an operational error.
pub fn run_scenario(args: &RunArgs, config: Option<&Path>) -> Result<u8> {
    let mut scenario = load(&args.scenario)?;
    if let Some(config) = crate::load_config(config)? {
        scenario.config = config;
    }

    let report = match scenario.run() {
        Ok(report) => report,
        Err(e) => {
            println!("FAIL: {e}");
            return Ok(1);
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{json}");
    } else {
        print_summary(&report);
    }
    Ok(0)
}

/// Execute `twosig check`.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let scenario = load(&args.scenario)?;
    match scenario.lint() {
        Ok(()) => {
            println!(
                "OK: {} ({} steps)",
                args.scenario.display(),
                scenario.steps.len()
            );
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e}");
            Ok(1)
        }
    }
}

fn load(path: &Path) -> Result<Scenario> {
    Scenario::load(path).with_context(|| format!("loading scenario {}", path.display()))
}

fn print_summary(report: &ScenarioReport) {
    println!(
        "OK: {} steps, {} expected reverts, {} blocks",
        report.steps_run, report.expected_reverts, report.block_height
    );
    for (name, escrow) in &report.escrows {
        let deposits = report
            .native_deposits
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "  {name} {} {} nonce={} native={deposits}",
            escrow.address, escrow.phase, escrow.nonce
        );
    }
}
