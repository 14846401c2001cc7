//! Artifact seam: the compiled program being deployed.

use alloy_core::primitives::Bytes;
use anyhow::Result;

use crate::{ConstructorArgs, VerificationCall};

/// Supplies the deployment payload and the read-only probe used after deployment.
pub trait ArtifactProvider: Send + Sync {
    /// Contract name, for logs.
    fn name(&self) -> &str;

    /// Creation bytecode with the constructor arguments applied.
    fn encode_deployment(&self, constructor_args: &ConstructorArgs) -> Result<Bytes>;

    /// The call made against the deployed contract to check it responds, if any.
    fn verification_call(&self) -> Option<&VerificationCall>;
}
