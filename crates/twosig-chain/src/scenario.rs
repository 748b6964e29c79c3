//! # Scenarios
//!
//! A scenario is a YAML script of transactions run against a fresh chain:
//!
//! ```yaml
//! config:
//!   genesis:
//!     - { account: depositor, balance: 10 }
//! steps:
//!   - { op: deploy_escrow, name: vault, deployer: owner }
//!   - { op: set_signer, escrow: vault, caller: owner, index: 0, signer: alice }
//!   - { op: set_signer, escrow: vault, caller: owner, index: 1, signer: bob }
//!   - { op: send_native, from: depositor, to: vault, amount: 10 }
//!   - { op: propose, escrow: vault, caller: alice, receiver: carol, amount: 10 }
//!   - { op: sign, escrow: vault, caller: alice, approve: true }
//!   - { op: sign, escrow: vault, caller: bob, approve: true }
//!   - { op: execute, escrow: vault, caller: carol }
//!   - { op: execute, escrow: vault, caller: carol, expect_error: state }
//! ```
//!
//! Account fields take a label (hashed to an address) or a hex address.
//! Contract fields (`escrow`, `factory`, `token`, `implementation`) must
//! name a contract deployed by an earlier step, or be a hex address. The
//! word `null` is the null address. An omitted `nonce` uses the escrow's
//! current nonce.
//!
//! A step with `expect_error` must revert with that error kind; any other
//! step must commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twosig_core::{Address, Amount, LogEntry};
use twosig_escrow::{ErrorKind, EscrowSnapshot, REQUIRED_APPROVALS, SIGNER_SLOTS};

use crate::chain::Chain;
use crate::config::{resolve_account, ChainConfig, ConfigError};
use crate::error::ChainError;

/// Errors loading or running a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The embedded chain config is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A contract field names nothing deployed so far.
    #[error("step {step} ({op}): unknown contract {name:?}")]
    UnknownContract {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// An account field is neither a label nor a valid hex address.
    #[error("step {step} ({op}): {source}")]
    InvalidAccount {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The resolution failure.
        source: ConfigError,
    },

    /// Two steps deploy under the same name.
    #[error("step {step} ({op}): name {name:?} is already taken")]
    DuplicateName {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The reused name.
        name: String,
    },

    /// A step that should have committed reverted.
    #[error("step {step} ({op}) reverted: {source}")]
    UnexpectedRevert {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The revert.
        source: ChainError,
    },

    /// A step that should have reverted committed.
    #[error("step {step} ({op}) committed, expected a {expected} error")]
    UnexpectedCommit {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The expected error kind.
        expected: ErrorKind,
    },

    /// A step reverted with the wrong error kind.
    #[error("step {step} ({op}) reverted with {actual} error ({message}), expected {expected}")]
    WrongErrorKind {
        /// 1-based step number.
        step: usize,
        /// Step operation.
        op: &'static str,
        /// The expected kind.
        expected: ErrorKind,
        /// The actual kind.
        actual: ErrorKind,
        /// The revert message.
        message: String,
    },
}

fn default_quorum() -> u8 {
    REQUIRED_APPROVALS as u8
}

fn default_signer_count() -> u8 {
    SIGNER_SLOTS as u8
}

fn default_approve() -> bool {
    true
}

/// One transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Deploy a standard token.
    DeployAsset {
        /// Name later steps use for the token.
        name: String,
        /// Receives the supply.
        deployer: String,
        /// Ticker symbol.
        symbol: String,
        /// Initial supply.
        supply: Amount,
    },
    /// Deploy an escrow directly.
    DeployEscrow {
        /// Name later steps use for the escrow.
        name: String,
        /// Becomes controller.
        deployer: String,
        /// Signer slots.
        #[serde(default = "default_signer_count")]
        signer_count: u8,
        /// Required approvals.
        #[serde(default = "default_quorum")]
        quorum: u8,
    },
    /// Deploy a factory.
    DeployFactory {
        /// Name later steps use for the factory.
        name: String,
        /// Deployer.
        deployer: String,
        /// Reference escrow.
        implementation: String,
    },
    /// Create an escrow through a factory.
    CreateEscrow {
        /// Name later steps use for the new escrow.
        name: String,
        /// The factory.
        factory: String,
        /// Becomes controller.
        caller: String,
        /// Signer slots.
        #[serde(default = "default_signer_count")]
        signer_count: u8,
        /// Required approvals.
        #[serde(default = "default_quorum")]
        quorum: u8,
    },
    /// Native transfer.
    SendNative {
        /// Sender.
        from: String,
        /// Recipient.
        to: String,
        /// Units.
        amount: Amount,
    },
    /// Asset transfer.
    TransferAsset {
        /// The token.
        token: String,
        /// Sender.
        from: String,
        /// Recipient.
        to: String,
        /// Units.
        amount: Amount,
    },
    /// `setSigner`.
    SetSigner {
        /// The escrow.
        escrow: String,
        /// Caller.
        caller: String,
        /// Slot.
        index: u8,
        /// New signer, `null` to clear.
        signer: String,
    },
    /// `proposeWithdrawl`.
    Propose {
        /// The escrow.
        escrow: String,
        /// Caller.
        caller: String,
        /// Presented nonce; current nonce if omitted.
        #[serde(default)]
        nonce: Option<u64>,
        /// Token; native currency if omitted.
        #[serde(default)]
        token: Option<String>,
        /// Recipient.
        receiver: String,
        /// Units.
        amount: Amount,
    },
    /// `signProposal`, or `signProposalIndexed` when `index` is given.
    Sign {
        /// The escrow.
        escrow: String,
        /// Caller.
        caller: String,
        /// Presented nonce; current nonce if omitted.
        #[serde(default)]
        nonce: Option<u64>,
        /// Slot, for the indexed variant.
        #[serde(default)]
        index: Option<u8>,
        /// Approve or revoke.
        #[serde(default = "default_approve")]
        approve: bool,
    },
    /// `executeProposal`.
    Execute {
        /// The escrow.
        escrow: String,
        /// Caller.
        caller: String,
    },
}

impl Step {
    /// The `op` tag.
    pub fn op(&self) -> &'static str {
        match self {
            Step::DeployAsset { .. } => "deploy_asset",
            Step::DeployEscrow { .. } => "deploy_escrow",
            Step::DeployFactory { .. } => "deploy_factory",
            Step::CreateEscrow { .. } => "create_escrow",
            Step::SendNative { .. } => "send_native",
            Step::TransferAsset { .. } => "transfer_asset",
            Step::SetSigner { .. } => "set_signer",
            Step::Propose { .. } => "propose",
            Step::Sign { .. } => "sign",
            Step::Execute { .. } => "execute",
        }
    }

    /// Name this step deploys under, if any.
    fn declares(&self) -> Option<&str> {
        match self {
            Step::DeployAsset { name, .. }
            | Step::DeployEscrow { name, .. }
            | Step::DeployFactory { name, .. }
            | Step::CreateEscrow { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Contract names this step refers to.
    fn references(&self) -> Vec<&str> {
        match self {
            Step::DeployFactory { implementation, .. } => vec![implementation.as_str()],
            Step::CreateEscrow { factory, .. } => vec![factory.as_str()],
            Step::TransferAsset { token, .. } => vec![token.as_str()],
            Step::SetSigner { escrow, .. } | Step::Sign { escrow, .. } | Step::Execute { escrow, .. } => {
                vec![escrow.as_str()]
            }
            Step::Propose { escrow, token, .. } => {
                let mut names = vec![escrow.as_str()];
                names.extend(token.as_deref());
                names
            }
            _ => Vec::new(),
        }
    }
}

/// A step and its expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// The transaction.
    #[serde(flatten)]
    pub step: Step,
    /// Error kind the step must revert with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_error: Option<ErrorKind>,
}

/// A scripted run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Chain configuration.
    #[serde(default)]
    pub config: ChainConfig,
    /// Transactions, in order.
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Steps executed.
    pub steps_run: usize,
    /// Steps that reverted as expected.
    pub expected_reverts: usize,
    /// Sealed blocks.
    pub block_height: u64,
    /// Deployed contracts by name.
    pub contracts: BTreeMap<String, Address>,
    /// Final state of every named escrow.
    pub escrows: BTreeMap<String, EscrowSnapshot>,
    /// Native holdings of every named escrow.
    pub native_deposits: BTreeMap<String, Amount>,
    /// The full event log.
    pub events: Vec<LogEntry>,
}

impl Scenario {
    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML and validate config accounts.
    pub fn from_yaml_str(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_yaml::from_str(content)?;
        scenario.config.genesis_balances()?;
        Ok(scenario)
    }

    /// Check that every contract reference names an earlier deployment and
    /// that deployment names are unique. Runs nothing.
    pub fn lint(&self) -> Result<(), ScenarioError> {
        let mut declared: Vec<&str> = Vec::new();
        for (i, entry) in self.steps.iter().enumerate() {
            let (step, op) = (i + 1, entry.step.op());
            for name in entry.step.references() {
                if !declared.contains(&name) && !is_literal_address(name) {
                    return Err(ScenarioError::UnknownContract {
                        step,
                        op,
                        name: name.to_string(),
                    });
                }
            }
            if let Some(name) = entry.step.declares() {
                if declared.contains(&name) {
                    return Err(ScenarioError::DuplicateName {
                        step,
                        op,
                        name: name.to_string(),
                    });
                }
                declared.push(name);
            }
        }
        Ok(())
    }

    /// Run every step against a fresh chain.
    pub fn run(&self) -> Result<ScenarioReport, ScenarioError> {
        self.lint()?;
        let chain = Chain::from_config(&self.config)?;
        let mut runner = Runner {
            chain,
            contracts: BTreeMap::new(),
            escrows: Vec::new(),
        };

        let mut expected_reverts = 0;
        for (i, entry) in self.steps.iter().enumerate() {
            let (step, op) = (i + 1, entry.step.op());
            let outcome = runner.apply(step, &entry.step)?;
            match (outcome, entry.expect_error) {
                (Ok(()), None) => {}
                (Ok(()), Some(expected)) => {
                    return Err(ScenarioError::UnexpectedCommit { step, op, expected });
                }
                (Err(source), None) => {
                    return Err(ScenarioError::UnexpectedRevert { step, op, source });
                }
                (Err(e), Some(expected)) if e.kind() == expected => {
                    tracing::debug!(step, op, %expected, error = %e, "step reverted as expected");
                    expected_reverts += 1;
                }
                (Err(e), Some(expected)) => {
                    return Err(ScenarioError::WrongErrorKind {
                        step,
                        op,
                        expected,
                        actual: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let report = runner.report(self.steps.len(), expected_reverts);
        tracing::info!(
            steps = report.steps_run,
            expected_reverts,
            blocks = report.block_height,
            "scenario complete"
        );
        Ok(report)
    }
}

fn is_literal_address(name: &str) -> bool {
    name == "null" || name.starts_with("0x") || name.starts_with("0X")
}

struct Runner {
    chain: Chain,
    contracts: BTreeMap<String, Address>,
    escrows: Vec<String>,
}

impl Runner {
    fn account(&self, step: usize, op: &'static str, name: &str) -> Result<Address, ScenarioError> {
        if name == "null" {
            return Ok(Address::NULL);
        }
        if let Some(address) = self.contracts.get(name) {
            return Ok(*address);
        }
        resolve_account(name).map_err(|source| ScenarioError::InvalidAccount { step, op, source })
    }

    fn contract(&self, step: usize, op: &'static str, name: &str) -> Result<Address, ScenarioError> {
        if is_literal_address(name) {
            return self.account(step, op, name);
        }
        self.contracts
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownContract {
                step,
                op,
                name: name.to_string(),
            })
    }

    fn register(&mut self, name: &str, address: Address, escrow: bool) {
        self.contracts.insert(name.to_string(), address);
        if escrow {
            self.escrows.push(name.to_string());
        }
    }

    /// Outer error: the step could not be interpreted. Inner: the chain
    /// reverted.
    fn apply(&mut self, step: usize, s: &Step) -> Result<Result<(), ChainError>, ScenarioError> {
        let op = s.op();
        let chain = self.chain.clone();
        let result = match s {
            Step::DeployAsset {
                name,
                deployer,
                symbol,
                supply,
            } => {
                let deployer = self.account(step, op, deployer)?;
                chain
                    .deploy_asset(&deployer, name, symbol, *supply)
                    .map(|a| self.register(name, a, false))
            }
            Step::DeployEscrow {
                name,
                deployer,
                signer_count,
                quorum,
            } => {
                let deployer = self.account(step, op, deployer)?;
                chain
                    .deploy_escrow(&deployer, *signer_count, *quorum)
                    .map(|a| self.register(name, a, true))
            }
            Step::DeployFactory {
                name,
                deployer,
                implementation,
            } => {
                let deployer = self.account(step, op, deployer)?;
                let implementation = self.contract(step, op, implementation)?;
                chain
                    .deploy_factory(&deployer, &implementation)
                    .map(|a| self.register(name, a, false))
            }
            Step::CreateEscrow {
                name,
                factory,
                caller,
                signer_count,
                quorum,
            } => {
                let factory = self.contract(step, op, factory)?;
                let caller = self.account(step, op, caller)?;
                chain
                    .create_escrow(&factory, &caller, *signer_count, *quorum)
                    .map(|a| self.register(name, a, true))
            }
            Step::SendNative { from, to, amount } => {
                let from = self.account(step, op, from)?;
                let to = self.account(step, op, to)?;
                chain.send_native(&from, &to, *amount)
            }
            Step::TransferAsset {
                token,
                from,
                to,
                amount,
            } => {
                let token = self.contract(step, op, token)?;
                let from = self.account(step, op, from)?;
                let to = self.account(step, op, to)?;
                chain.transfer_asset(&token, &from, &to, *amount)
            }
            Step::SetSigner {
                escrow,
                caller,
                index,
                signer,
            } => {
                let escrow = self.contract(step, op, escrow)?;
                let caller = self.account(step, op, caller)?;
                let signer = self.account(step, op, signer)?;
                chain.set_signer(&escrow, &caller, *index, signer)
            }
            Step::Propose {
                escrow,
                caller,
                nonce,
                token,
                receiver,
                amount,
            } => {
                let escrow = self.contract(step, op, escrow)?;
                let caller = self.account(step, op, caller)?;
                let token = match token {
                    Some(token) => self.contract(step, op, token)?,
                    None => Address::NULL,
                };
                let receiver = self.account(step, op, receiver)?;
                current_nonce(&chain, &escrow, *nonce).and_then(|nonce| {
                    chain.propose_withdrawal(&escrow, &caller, nonce, token, receiver, *amount)
                })
            }
            Step::Sign {
                escrow,
                caller,
                nonce,
                index,
                approve,
            } => {
                let escrow = self.contract(step, op, escrow)?;
                let caller = self.account(step, op, caller)?;
                current_nonce(&chain, &escrow, *nonce).and_then(|nonce| match index {
                    Some(index) => chain.sign_proposal_indexed(&escrow, &caller, nonce, *index, *approve),
                    None => chain.sign_proposal(&escrow, &caller, nonce, *approve),
                })
            }
            Step::Execute { escrow, caller } => {
                let escrow = self.contract(step, op, escrow)?;
                let caller = self.account(step, op, caller)?;
                chain.execute_proposal(&escrow, &caller).map(|_| ())
            }
        };
        Ok(result)
    }

    fn report(&self, steps_run: usize, expected_reverts: usize) -> ScenarioReport {
        let mut escrows = BTreeMap::new();
        let mut native_deposits = BTreeMap::new();
        for name in &self.escrows {
            let Some(address) = self.contracts.get(name) else {
                continue;
            };
            if let Ok(snapshot) = self.chain.escrow_snapshot(address) {
                escrows.insert(name.clone(), snapshot);
            }
            native_deposits.insert(name.clone(), self.chain.native_balance(address));
        }
        ScenarioReport {
            steps_run,
            expected_reverts,
            block_height: self.chain.block_height(),
            contracts: self.contracts.clone(),
            escrows,
            native_deposits,
            events: self.chain.events(),
        }
    }
}

fn current_nonce(chain: &Chain, escrow: &Address, presented: Option<u64>) -> Result<u64, ChainError> {
    match presented {
        Some(nonce) => Ok(nonce),
        None => chain.nonce(escrow),
    }
}
