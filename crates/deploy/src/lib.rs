//! chainship-deploy - Deployment library for compiled smart contracts.
//!
//! This crate publishes a compiled contract to a configured EVM network, waits for the
//! transaction to be confirmed, checks that the deployed contract answers, and produces a
//! structured record of the deployment.

mod artifact;
pub use artifact::{ConstructorArgs, HardhatArtifact, VerificationCall};

mod executor;
pub use executor::{DeploymentExecutor, DeploymentRequest};

mod gas;
pub use gas::{GAS_BUFFER_PERCENT, GasEstimator, GasPlan};

mod identity;
pub use identity::{LegacyCreation, LocalKeyIdentity, SignedTransaction, UnlockedIdentity};

mod ledger;
pub use ledger::JsonRpcLedger;

mod network;
pub use network::{
    EXPLORER_ADDRESS_PLACEHOLDER, GasPricePolicy, NETWORKS_FILENAME, NetworkProfile,
    NetworkRegistry,
};

mod observer;
pub use observer::{DeploymentState, DeploymentStep, LifecycleEvent, TracingObserver};

mod outcome;
pub use outcome::{
    DeploymentFailure, DeploymentOutcome, DeploymentSuccess, FailureStage, VerificationResult,
};

mod recorder;
pub use recorder::{DeploymentRecord, DeploymentRecorder, FailureRecord, SerializedRecord};

pub mod rpc;

mod traits;
pub use traits::{
    ArtifactProvider, ConfirmationError, DeploymentObserver, Ledger, SigningIdentity,
    TransactionHandle, TransactionReceipt,
};
