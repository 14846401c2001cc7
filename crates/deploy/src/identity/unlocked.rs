use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use serde_json::json;

use crate::rpc::u64_quantity;
use crate::{GasPricePolicy, JsonRpcLedger, SigningIdentity, TransactionHandle};

/// An account whose key is held by the node, as development nodes expose their funded accounts.
///
/// Transactions go through `eth_sendTransaction`; the node picks the nonce.
#[derive(Debug, Clone)]
pub struct UnlockedIdentity {
    address: Address,
    gas_price: GasPricePolicy,
    ledger: JsonRpcLedger,
}

impl UnlockedIdentity {
    pub fn new(address: Address, ledger: JsonRpcLedger) -> Self {
        Self {
            address,
            gas_price: GasPricePolicy::Node,
            ledger,
        }
    }

    /// Use the first account the node manages.
    pub async fn first_account(ledger: JsonRpcLedger) -> Result<Self> {
        let accounts = ledger
            .accounts()
            .await
            .context("Failed to list node accounts")?;
        let address = *accounts
            .first()
            .context("The node manages no accounts; provide a private key instead")?;

        tracing::debug!(%address, "Using node-managed account");

        Ok(Self::new(address, ledger))
    }

    pub fn with_gas_price(mut self, gas_price: GasPricePolicy) -> Self {
        self.gas_price = gas_price;
        self
    }
}

impl SigningIdentity for UnlockedIdentity {
    fn address(&self) -> Address {
        self.address
    }

    async fn authorize_and_submit(&self, payload: &Bytes, gas_limit: u64) -> Result<TransactionHandle> {
        let mut transaction = json!({
            "from": self.address,
            "data": payload,
            "gas": u64_quantity(gas_limit),
        });
        if let GasPricePolicy::Fixed(wei) = self.gas_price {
            transaction["gasPrice"] = json!(u64_quantity(wei));
        }

        let hash = self
            .ledger
            .send_transaction(transaction)
            .await
            .context("eth_sendTransaction was rejected")?;

        Ok(TransactionHandle { hash, nonce: None })
    }
}
