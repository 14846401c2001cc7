//! Lifecycle events emitted while a deployment runs.

use std::fmt;

use crate::{DeploymentObserver, FailureStage};

/// Steps of a deployment run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DeploymentStep {
    Preflight,
    GasEstimation,
    Submission,
    Confirmation,
    AddressResolution,
    Verification,
}

/// The step a fatal stage belongs to. Verification never aborts a run.
impl From<FailureStage> for DeploymentStep {
    fn from(stage: FailureStage) -> Self {
        match stage {
            FailureStage::PreflightBalance => Self::Preflight,
            FailureStage::GasEstimation => Self::GasEstimation,
            FailureStage::Submission => Self::Submission,
            FailureStage::ConfirmationWait => Self::Confirmation,
            FailureStage::AddressResolution => Self::AddressResolution,
        }
    }
}

/// States of the deployment state machine.
///
/// `Idle -> PreflightChecked -> GasPlanned -> Submitted -> Confirmed -> Verified -> Done`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentState {
    Idle,
    PreflightChecked,
    GasPlanned,
    Submitted,
    Confirmed,
    Verified,
    Done,
    Failed(FailureStage),
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(stage) => write!(f, "Failed({})", stage),
            state => fmt::Debug::fmt(state, f),
        }
    }
}

impl DeploymentState {
    /// The state following this one on the success path.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::PreflightChecked),
            Self::PreflightChecked => Some(Self::GasPlanned),
            Self::GasPlanned => Some(Self::Submitted),
            Self::Submitted => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Verified),
            Self::Verified => Some(Self::Done),
            Self::Done | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StepEntered(DeploymentStep),
    StepSucceeded {
        step: DeploymentStep,
        /// State of the run once the step succeeded.
        state: DeploymentState,
    },
    StepFailed {
        step: DeploymentStep,
        cause: String,
        /// `Failed(_)` for fatal steps; the run carries on for verification.
        state: DeploymentState,
    },
    /// The run reached a terminal state. Always the last event of a run.
    Finished(DeploymentState),
}

/// Observer writing every lifecycle event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DeploymentObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::StepEntered(step) => {
                tracing::info!(%step, "Starting {}...", step);
            }
            LifecycleEvent::StepSucceeded { step, state } => {
                tracing::debug!(%step, %state, "Step succeeded");
            }
            LifecycleEvent::StepFailed { step, cause, state } => match state {
                DeploymentState::Failed(stage) => {
                    tracing::error!(%step, %stage, cause = %cause, "Step failed");
                }
                _ => {
                    tracing::warn!(%step, cause = %cause, "Step failed, continuing");
                }
            },
            LifecycleEvent::Finished(DeploymentState::Done) => {
                tracing::info!("Deployment completed");
            }
            LifecycleEvent::Finished(state) => {
                tracing::error!(%state, "Deployment aborted");
            }
        }
    }
}
