use std::str::FromStr;

use alloy_core::primitives::{Address, Bytes, U256};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};

use super::LegacyCreation;
use crate::{GasPricePolicy, JsonRpcLedger, SigningIdentity, TransactionHandle};

/// An account whose private key is held locally.
///
/// Transactions are signed as EIP-155 legacy transactions and sent with
/// `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct LocalKeyIdentity {
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
    gas_price: GasPricePolicy,
    ledger: JsonRpcLedger,
}

impl LocalKeyIdentity {
    /// Build an identity from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(
        private_key: &str,
        chain_id: u64,
        gas_price: GasPricePolicy,
        ledger: JsonRpcLedger,
    ) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .context("Invalid private key: expected 32 hex-encoded bytes")?;
        let address = Address::from_slice(signer.address().as_slice());

        Ok(Self {
            signer,
            address,
            chain_id,
            gas_price,
            ledger,
        })
    }

    async fn resolve_gas_price(&self) -> Result<U256> {
        match self.gas_price {
            GasPricePolicy::Fixed(wei) => Ok(U256::from(wei)),
            GasPricePolicy::Node => self.ledger.gas_price().await,
        }
    }
}

impl SigningIdentity for LocalKeyIdentity {
    fn address(&self) -> Address {
        self.address
    }

    async fn authorize_and_submit(&self, payload: &Bytes, gas_limit: u64) -> Result<TransactionHandle> {
        let nonce = self
            .ledger
            .pending_nonce(self.address)
            .await
            .context("Failed to fetch deployer nonce")?;
        let gas_price = self
            .resolve_gas_price()
            .await
            .context("Failed to fetch gas price")?;

        let signed = LegacyCreation {
            nonce,
            gas_price,
            gas_limit,
            value: U256::ZERO,
            data: payload.clone(),
            chain_id: self.chain_id,
        }
        .sign(self.signer.credential())?;

        tracing::debug!(
            nonce,
            %gas_price,
            gas_limit,
            tx_hash = %signed.hash,
            "Submitting signed deployment transaction"
        );

        let hash = self
            .ledger
            .send_raw_transaction(&signed.raw)
            .await
            .context("eth_sendRawTransaction was rejected")?;

        if hash != signed.hash {
            tracing::warn!(
                expected = %signed.hash,
                reported = %hash,
                "Node reported a different transaction hash"
            );
        }

        Ok(TransactionHandle {
            hash,
            nonce: Some(nonce),
        })
    }
}
