//! Structured deployment records.
//!
//! A success record is the flat JSON object downstream consumers (frontends, config generators)
//! read the deployed address from. Its keys and the nullable `blockNumber` are a stable contract.

use std::io::Write;
use std::path::Path;

use alloy_core::hex;
use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeploymentOutcome, FailureStage};

/// Record of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network: String,
    pub contract_address: String,
    pub deployer: String,
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub timestamp_iso8601: String,
    /// Decimal string, so consumers never round it through a float.
    pub estimated_gas: String,
}

impl DeploymentRecord {
    /// Parse a record produced by [`DeploymentRecorder`].
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse deployment record as JSON")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record from {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn contract_address(&self) -> Result<Address> {
        self.contract_address
            .parse()
            .with_context(|| format!("Invalid contract address '{}'", self.contract_address))
    }

    pub fn transaction_hash(&self) -> Result<B256> {
        self.transaction_hash
            .parse()
            .with_context(|| format!("Invalid transaction hash '{}'", self.transaction_hash))
    }

    pub fn estimated_gas(&self) -> Result<u64> {
        self.estimated_gas
            .parse()
            .with_context(|| format!("Invalid gas estimate '{}'", self.estimated_gas))
    }
}

/// Record of a failed deployment. Carries no partial success fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: FailureStage,
    pub cause: String,
}

/// The record produced for one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedRecord {
    Success(DeploymentRecord),
    Failure(FailureRecord),
}

impl SerializedRecord {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize deployment record")
    }
}

/// Turns outcomes into records and writes them to their sinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentRecorder;

impl DeploymentRecorder {
    /// Record `outcome`, stamped with the current time.
    pub fn record(&self, outcome: &DeploymentOutcome) -> SerializedRecord {
        self.record_at(outcome, Utc::now())
    }

    /// Record `outcome`, stamped with `recorded_at`.
    pub fn record_at(
        &self,
        outcome: &DeploymentOutcome,
        recorded_at: DateTime<Utc>,
    ) -> SerializedRecord {
        match outcome {
            DeploymentOutcome::Success(success) => SerializedRecord::Success(DeploymentRecord {
                network: success.network_name.clone(),
                contract_address: success.contract_address.to_checksum(None),
                deployer: success.deployer_address.to_checksum(None),
                transaction_hash: hex::encode_prefixed(success.transaction_hash),
                block_number: success.block_number,
                timestamp_iso8601: recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                estimated_gas: success.estimated_gas.to_string(),
            }),
            DeploymentOutcome::Failure(failure) => SerializedRecord::Failure(FailureRecord {
                stage: failure.stage,
                cause: failure.cause.clone(),
            }),
        }
    }

    /// Write a success record to `out` and a failure record to `err`.
    pub fn emit(
        &self,
        record: &SerializedRecord,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> Result<()> {
        let json = record.to_json()?;
        let sink: &mut dyn Write = match record {
            SerializedRecord::Success(_) => out,
            SerializedRecord::Failure(_) => err,
        };
        writeln!(sink, "{}", json).context("Failed to write deployment record")?;
        sink.flush().context("Failed to flush deployment record")
    }

    /// Persist a record to `path`, creating parent directories as needed.
    pub fn save(&self, record: &SerializedRecord, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory {}", parent.display())
                })?;
            }
        }

        let content = record.to_json()?;
        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Deployment record saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{address, b256};
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::{DeploymentFailure, DeploymentSuccess, VerificationResult};

    fn success(block_number: Option<u64>, estimated_gas: u64) -> DeploymentOutcome {
        DeploymentSuccess {
            contract_address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            transaction_hash: b256!(
                "88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
            ),
            block_number,
            deployer_address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            network_name: "localhost".to_string(),
            estimated_gas,
            gas_limit: crate::GasPlan::from_estimate(estimated_gas).buffered_limit,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            verification: VerificationResult::Unavailable("skipped".to_string()),
            explorer_url: None,
        }
        .into()
    }

    fn recorded_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_success_record_keys() {
        let record = DeploymentRecorder.record_at(&success(Some(42), 1_234_567), recorded_at());
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "network": "localhost",
                "contractAddress": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                "deployer": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "transactionHash": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
                "blockNumber": 42,
                "timestampIso8601": "2025-03-14T15:09:26.000Z",
                "estimatedGas": "1234567"
            })
        );
    }

    #[test]
    fn test_block_number_is_null_when_unknown() {
        let record = DeploymentRecorder.record_at(&success(None, 21_000), recorded_at());
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert!(value.get("blockNumber").unwrap().is_null());
    }

    #[test]
    fn test_timestamp_is_taken_at_record_time() {
        let record = DeploymentRecorder.record_at(&success(Some(1), 21_000), recorded_at());
        let SerializedRecord::Success(record) = record else {
            panic!("expected a success record");
        };
        assert!(record.timestamp_iso8601.starts_with("2025-03-14"));
    }

    #[test]
    fn test_failure_record_has_only_stage_and_cause() {
        let outcome: DeploymentOutcome =
            DeploymentFailure::new(FailureStage::PreflightBalance, "no funds").into();
        let record = DeploymentRecorder.record_at(&outcome, recorded_at());
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "stage": "PreflightBalance", "cause": "no funds" }));
    }

    #[test]
    fn test_record_parses_back() {
        let estimated_gas = u64::MAX - 1;
        let record = DeploymentRecorder.record_at(&success(Some(7), estimated_gas), recorded_at());
        let parsed = DeploymentRecord::parse(&record.to_json().unwrap()).unwrap();

        assert_eq!(
            parsed.contract_address().unwrap(),
            address!("5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert_eq!(
            parsed.transaction_hash().unwrap(),
            b256!("88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b")
        );
        assert_eq!(parsed.estimated_gas, "18446744073709551614");
        assert_eq!(parsed.estimated_gas().unwrap(), estimated_gas);
        assert_eq!(SerializedRecord::Success(parsed), record);
    }

    #[test]
    fn test_emit_routes_by_outcome() {
        let recorder = DeploymentRecorder;
        let mut out = Vec::new();
        let mut err = Vec::new();

        let ok = recorder.record_at(&success(Some(1), 21_000), recorded_at());
        recorder.emit(&ok, &mut out, &mut err).unwrap();
        assert!(!out.is_empty());
        assert!(err.is_empty());

        out.clear();
        let failed = recorder.record_at(
            &DeploymentFailure::new(FailureStage::Submission, "nonce too low").into(),
            recorded_at(),
        );
        recorder.emit(&failed, &mut out, &mut err).unwrap();
        assert!(out.is_empty());
        assert!(String::from_utf8(err).unwrap().contains("nonce too low"));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir::TempDir::new("chainship-record").unwrap();
        let path = dir.path().join("deployments").join("localhost.json");

        let record = DeploymentRecorder.record_at(&success(Some(3), 500_000), recorded_at());
        DeploymentRecorder.save(&record, &path).unwrap();

        let loaded = DeploymentRecord::load_from_file(&path).unwrap();
        assert_eq!(SerializedRecord::Success(loaded), record);
    }
}
