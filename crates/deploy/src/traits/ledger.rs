//! Transport seam: the remote ledger the contract is published to.

use std::future::Future;
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::Result;

/// Handle to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: B256,
    /// Nonce the transaction was submitted with, when the identity chose it.
    pub nonce: Option<u64>,
}

/// Receipt of a mined transaction, reduced to the fields a deployment needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    /// Contract address exactly as the network reported it. Parsed during address resolution.
    pub contract_address: Option<String>,
    /// `Some(false)` when the transaction reverted. Pre-byzantium receipts carry no status.
    pub status: Option<bool>,
    pub gas_used: Option<u64>,
}

/// Why a confirmation wait ended without a usable receipt.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    /// The transaction was not confirmed within the allotted time.
    #[error("transaction {hash} not confirmed within {timeout:?}")]
    Timeout { hash: B256, timeout: Duration },

    /// The transaction was mined but its execution reverted.
    #[error("transaction {hash} reverted in block {block_number:?}")]
    Reverted { hash: B256, block_number: Option<u64> },

    /// The transport failed while waiting.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Read and confirmation facilities of a network.
///
/// Implementations must not retry on their own: every error is surfaced to the executor, which
/// classifies it.
pub trait Ledger: Send + Sync {
    /// The chain identifier reported by the network.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Spendable balance of `address`, in wei.
    fn balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Simulate a contract creation from `from` and return the raw gas units it needs.
    fn estimate_gas(
        &self,
        from: Address,
        payload: &Bytes,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Block until `handle` is mined with `confirmations` blocks on top of it (inclusive), or
    /// until `timeout` elapses.
    fn await_confirmation(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
        confirmations: u64,
    ) -> impl Future<Output = Result<TransactionReceipt, ConfirmationError>> + Send;

    /// Read-only call against `to` at the latest block.
    fn call(&self, to: Address, data: &Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}
