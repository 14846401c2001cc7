//! Signing seam: who pays for and authorizes the deployment.

use std::future::Future;

use alloy_core::primitives::{Address, Bytes};
use anyhow::Result;

use super::TransactionHandle;

/// An account able to authorize and submit a contract-creation transaction.
pub trait SigningIdentity: Send + Sync {
    /// The account address that deploys, and pays for, the contract.
    fn address(&self) -> Address;

    /// Authorize a contract creation carrying `payload` with the given gas limit and hand it to
    /// the network.
    ///
    /// An error means the network never accepted the transaction.
    fn authorize_and_submit(
        &self,
        payload: &Bytes,
        gas_limit: u64,
    ) -> impl Future<Output = Result<TransactionHandle>> + Send;
}
