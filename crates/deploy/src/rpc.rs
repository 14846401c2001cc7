//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::fmt;
use std::time::Duration;

use alloy_core::primitives::U256;
use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    /// Revert data or a node-specific detail.
    #[serde(default)]
    data: Option<Value>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        match &self.data {
            Some(Value::String(data)) => write!(f, ", data: {}", data),
            Some(Value::Null) | None => Ok(()),
            Some(data) => write!(f, ", data: {}", data),
        }
    }
}

/// Make a JSON-RPC call and deserialize its result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result. A `null` result deserializes fine into an `Option<T>`.
///
/// # Errors
/// Fails when the request cannot be sent, when the body is not JSON, or when the node answers
/// with an error object. The latter carries the node's message, code and data.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request to {}", method, url))?;

    let mut body: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = body.get_mut("error").map(Value::take) {
        let error: RpcError = serde_json::from_value(error)
            .with_context(|| format!("Malformed {} error response", method))?;
        anyhow::bail!("{} failed: {}", method, error);
    }

    let result = body
        .get_mut("result")
        .map(Value::take)
        .with_context(|| format!("No result in {} response", method))?;

    serde_json::from_value(result)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Parse a hex quantity (`0x2a`) into a `u64`.
pub fn parse_u64_quantity(quantity: &str) -> Result<u64, anyhow::Error> {
    let digits = quantity.trim_start_matches("0x");
    if digits.is_empty() {
        anyhow::bail!("Empty hex quantity: '{}'", quantity);
    }
    u64::from_str_radix(digits, 16)
        .with_context(|| format!("Invalid hex quantity: '{}'", quantity))
}

/// Parse a hex quantity (`0xde0b6b3a7640000`) into a `U256`.
pub fn parse_u256_quantity(quantity: &str) -> Result<U256, anyhow::Error> {
    let digits = quantity.trim_start_matches("0x");
    if digits.is_empty() {
        anyhow::bail!("Empty hex quantity: '{}'", quantity);
    }
    U256::from_str_radix(digits, 16)
        .with_context(|| format!("Invalid hex quantity: '{}'", quantity))
}

/// Format a `u64` as a JSON-RPC hex quantity.
pub fn u64_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Deserialize an optional `u64` from a nullable hex string.
pub(crate) fn deserialize_opt_u64_from_hex<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    s.map(|s| parse_u64_quantity(&s).map_err(serde::de::Error::custom))
        .transpose()
}
