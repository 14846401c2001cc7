//! EIP-155 legacy contract-creation transactions.

use alloy_core::primitives::{B256, Bytes, U256, keccak256};
use alloy_core::rlp::{Encodable, Header};
use anyhow::{Context, Result};
use k256::ecdsa::SigningKey;

/// Unsigned contract creation. `to` is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCreation {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

/// RLP-encoded signed transaction and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
}

impl LegacyCreation {
    /// Preimage of the EIP-155 signing hash:
    /// `rlp([nonce, gasPrice, gas, "", value, data, chainId, 0, 0])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let to = Bytes::new();
        rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &to,
            &self.value,
            &self.data,
            &self.chain_id,
            &0u8,
            &0u8,
        ])
    }

    /// Sign with `key` and encode for `eth_sendRawTransaction`.
    pub fn sign(&self, key: &SigningKey) -> Result<SignedTransaction> {
        let (v, r, s) = self.signature(key)?;
        let to = Bytes::new();
        let raw = rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &to,
            &self.value,
            &self.data,
            &v,
            &r,
            &s,
        ]);

        Ok(SignedTransaction {
            hash: keccak256(&raw),
            raw: raw.into(),
        })
    }

    /// `(v, r, s)` with `v = recovery_id + chain_id * 2 + 35`.
    fn signature(&self, key: &SigningKey) -> Result<(u64, U256, U256)> {
        let hash = keccak256(self.signing_payload());
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(hash.as_slice())
            .context("Failed to sign deployment transaction")?;

        let bytes = signature.to_bytes();
        let r = U256::from_be_slice(&bytes[..32]);
        let s = U256::from_be_slice(&bytes[32..]);

        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(recovery_id.to_byte())))
            .with_context(|| format!("Chain id {} is too large for EIP-155", self.chain_id))?;

        Ok((v, r, s))
    }
}

fn rlp_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length: usize = fields.iter().map(|field| field.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}
