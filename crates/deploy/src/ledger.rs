//! JSON-RPC implementation of the [`Ledger`] transport.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::rpc::{self, deserialize_opt_u64_from_hex};
use crate::{ConfirmationError, Ledger, TransactionHandle, TransactionReceipt};

/// Default interval between receipt polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    block_number: Option<u64>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    status: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_u64_from_hex")]
    gas_used: Option<u64>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
            status: receipt.status.map(|status| status == 1),
            gas_used: receipt.gas_used,
        }
    }
}

/// Why a single receipt poll did not yield a confirmed receipt.
#[derive(Debug)]
enum Poll {
    /// Not mined yet, or not deep enough yet.
    Pending,
    Failed(anyhow::Error),
}

/// Ethereum JSON-RPC client for one endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    client: reqwest::Client,
    url: Url,
    poll_interval: Duration,
}

impl JsonRpcLedger {
    pub fn new(url: Url) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            url,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Change how often receipts are polled while waiting for confirmation.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw JSON-RPC call against this endpoint.
    pub async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        rpc::json_rpc_call(&self.client, &self.url, method, params).await
    }

    pub async fn block_number(&self) -> Result<u64> {
        let block: String = self.request("eth_blockNumber", vec![]).await?;
        rpc::parse_u64_quantity(&block).context("Failed to parse block number")
    }

    pub async fn gas_price(&self) -> Result<U256> {
        let price: String = self.request("eth_gasPrice", vec![]).await?;
        rpc::parse_u256_quantity(&price).context("Failed to parse gas price")
    }

    /// Next nonce for `address`, counting pending transactions.
    pub async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let nonce: String = self
            .request("eth_getTransactionCount", vec![json!(address), json!("pending")])
            .await?;
        rpc::parse_u64_quantity(&nonce).context("Failed to parse nonce")
    }

    /// Accounts managed by the node.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.request("eth_accounts", vec![]).await
    }

    /// Submit a transaction signed by a node-managed account.
    pub async fn send_transaction(&self, transaction: serde_json::Value) -> Result<B256> {
        self.request("eth_sendTransaction", vec![transaction]).await
    }

    /// Submit a locally signed, RLP-encoded transaction.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256> {
        self.request("eth_sendRawTransaction", vec![json!(raw)]).await
    }

    async fn receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        Ok(receipt.map(Into::into))
    }

    /// One receipt poll: a receipt is confirmed once `confirmations` blocks, counting its own,
    /// are on the chain.
    ///
    /// # Errors
    /// [`Poll::Pending`] while the receipt is missing or too shallow, [`Poll::Failed`] on any
    /// transport error. Only the former is retried.
    async fn poll_confirmed(&self, hash: B256, confirmations: u64) -> Result<TransactionReceipt, Poll> {
        let receipt = self
            .receipt(hash)
            .await
            .map_err(Poll::Failed)?
            .ok_or(Poll::Pending)?;

        if confirmations > 1 {
            let Some(included) = receipt.block_number else {
                return Err(Poll::Pending);
            };
            let latest = self.block_number().await.map_err(Poll::Failed)?;
            if latest.saturating_sub(included) + 1 < confirmations {
                return Err(Poll::Pending);
            }
        }

        Ok(receipt)
    }
}

impl Ledger for JsonRpcLedger {
    async fn chain_id(&self) -> Result<u64> {
        let chain_id: String = self.request("eth_chainId", vec![]).await?;
        rpc::parse_u64_quantity(&chain_id).context("Failed to parse chain id")
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        let balance: String = self
            .request("eth_getBalance", vec![json!(address), json!("latest")])
            .await?;
        rpc::parse_u256_quantity(&balance).context("Failed to parse balance")
    }

    async fn estimate_gas(&self, from: Address, payload: &Bytes) -> Result<u64> {
        let units: String = self
            .request(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": payload })],
            )
            .await?;
        rpc::parse_u64_quantity(&units).context("Failed to parse gas estimate")
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
        timeout: Duration,
        confirmations: u64,
    ) -> Result<TransactionReceipt, ConfirmationError> {
        let hash = handle.hash;

        tracing::debug!(
            tx_hash = %hash,
            timeout_ms = timeout.as_millis() as u64,
            confirmations,
            "Waiting for transaction receipt..."
        );

        let backoff = ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(usize::MAX);

        let wait = (|| self.poll_confirmed(hash, confirmations))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(|poll| matches!(poll, Poll::Pending))
            .notify(|_, delay| {
                tracing::trace!(tx_hash = %hash, ?delay, "Transaction not confirmed yet");
            });

        let receipt = match tokio::time::timeout(timeout, wait).await {
            Err(_) => return Err(ConfirmationError::Timeout { hash, timeout }),
            Ok(Err(Poll::Failed(e))) => {
                return Err(ConfirmationError::Transport(
                    e.context("Failed to fetch transaction receipt"),
                ));
            }
            Ok(Err(Poll::Pending)) => return Err(ConfirmationError::Timeout { hash, timeout }),
            Ok(Ok(receipt)) => receipt,
        };

        if receipt.status == Some(false) {
            return Err(ConfirmationError::Reverted {
                hash,
                block_number: receipt.block_number,
            });
        }

        Ok(receipt)
    }

    async fn call(&self, to: Address, data: &Bytes) -> Result<Bytes> {
        self.request(
            "eth_call",
            vec![json!({ "to": to, "data": data }), json!("latest")],
        )
        .await
    }
}
