//! Trait seams for the collaborators of a deployment run.
//!
//! The executor never talks to a network, a key or a compiler directly. It drives these traits,
//! so a run can be exercised against a live JSON-RPC node or against in-memory doubles.
//!
//! # Example
//!
//! ```no_run
//! use chainship_deploy::{
//!     ConstructorArgs, DeploymentExecutor, DeploymentRequest, HardhatArtifact, JsonRpcLedger,
//!     NetworkRegistry, TracingObserver, UnlockedIdentity,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let network = NetworkRegistry::builtin().get("localhost")?.clone();
//! let ledger = JsonRpcLedger::new(network.require_rpc_url()?.clone())?;
//! let identity = UnlockedIdentity::first_account(ledger.clone()).await?;
//! let artifact = HardhatArtifact::load("artifacts/contracts/Project.sol/Project.json")?
//!     .with_verification_call("getPlatformStats()")?;
//!
//! let executor = DeploymentExecutor::new(ledger).with_observer(TracingObserver);
//! let request = DeploymentRequest::new(artifact, network, identity, ConstructorArgs::default());
//! let outcome = executor.run(&request).await;
//! # Ok(())
//! # }
//! ```

mod artifact;
mod identity;
mod ledger;
mod observer;

pub use artifact::ArtifactProvider;
pub use identity::SigningIdentity;
pub use ledger::{ConfirmationError, Ledger, TransactionHandle, TransactionReceipt};
pub use observer::DeploymentObserver;
