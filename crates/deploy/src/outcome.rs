//! Deployment outcome types.
//!
//! A run produces exactly one [`DeploymentOutcome`]: either a [`DeploymentSuccess`] carrying
//! everything a downstream consumer needs to locate the contract, or a [`DeploymentFailure`]
//! carrying the stage that aborted the run and a human-readable cause.

use alloy_core::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fatal stages of a deployment run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum FailureStage {
    /// The deployer account holds no funds.
    PreflightBalance,
    /// The network could not simulate the deployment transaction.
    GasEstimation,
    /// The network rejected the deployment transaction.
    Submission,
    /// The transaction was not confirmed within the network timeout, or reverted.
    ConfirmationWait,
    /// The confirmed receipt does not tell where the contract lives.
    AddressResolution,
}

/// A classified deployment failure.
///
/// The cause is always an interpreted string, never a raw transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("deployment failed at {stage}: {cause}")]
pub struct DeploymentFailure {
    pub stage: FailureStage,
    pub cause: String,
}

impl DeploymentFailure {
    pub fn new(stage: FailureStage, cause: impl Into<String>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// Classify a collaborator error, keeping its whole context chain in the cause.
    pub fn from_error(stage: FailureStage, error: &anyhow::Error) -> Self {
        Self::new(stage, format!("{:#}", error))
    }
}

/// Result of the single post-deploy read-only call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The call succeeded and returned these readings, in declaration order.
    Confirmed(Vec<U256>),
    /// The call could not be made or its answer could not be decoded.
    Unavailable(String),
}

impl VerificationResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Everything known about a confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSuccess {
    pub contract_address: Address,
    pub transaction_hash: B256,
    /// `None` when the transport did not report the inclusion block.
    pub block_number: Option<u64>,
    pub deployer_address: Address,
    pub network_name: String,
    /// Raw units reported by the network simulation (before buffering).
    pub estimated_gas: u64,
    /// Gas limit the transaction was submitted with.
    pub gas_limit: u64,
    pub timestamp: DateTime<Utc>,
    pub verification: VerificationResult,
    /// Explorer link for the contract, when the network profile defines one.
    pub explorer_url: Option<String>,
}

/// Terminal artifact of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Success(Box<DeploymentSuccess>),
    Failure(DeploymentFailure),
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The stage the run failed at, if it failed.
    pub fn failed_stage(&self) -> Option<FailureStage> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.stage),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success(_) => 0,
            Self::Failure(_) => 1,
        }
    }
}

impl From<DeploymentFailure> for DeploymentOutcome {
    fn from(failure: DeploymentFailure) -> Self {
        Self::Failure(failure)
    }
}

impl From<DeploymentSuccess> for DeploymentOutcome {
    fn from(success: DeploymentSuccess) -> Self {
        Self::Success(Box::new(success))
    }
}
