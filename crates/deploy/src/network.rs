//! Network profiles and the registry they are looked up in.
//!
//! Profiles are layered with figment: the built-in profiles come first, then an optional TOML
//! file, then `CHAINSHIP_NETWORKS__<NAME>__<FIELD>` environment variables.
//!
//! ```toml
//! [networks.core_testnet2]
//! chain_id = 1115
//! rpc_url = "https://rpc.test2.btcs.network"
//! gas_price = 20000000000
//! timeout_ms = 60000
//! explorer_url = "https://scan.test2.btcs.network/address/{address}"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder substituted with the contract address in explorer URL templates.
pub const EXPLORER_ADDRESS_PLACEHOLDER: &str = "{address}";

/// Name of the networks file looked up in the working and config directories.
pub const NETWORKS_FILENAME: &str = "networks.toml";

/// Prefix of the environment variables overriding profile fields.
const ENV_PREFIX: &str = "CHAINSHIP_";

const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CONFIRMATIONS: u64 = 1;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

/// How the gas price of a locally signed transaction is chosen.
///
/// Written as an optional integer in configuration: absent means [`GasPricePolicy::Node`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum GasPricePolicy {
    /// Ask the node (`eth_gasPrice`) at submission time.
    #[default]
    Node,
    /// Always pay this price, in wei per gas unit.
    Fixed(u64),
}

impl From<Option<u64>> for GasPricePolicy {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::Node, Self::Fixed)
    }
}

impl From<GasPricePolicy> for Option<u64> {
    fn from(policy: GasPricePolicy) -> Self {
        match policy {
            GasPricePolicy::Node => None,
            GasPricePolicy::Fixed(wei) => Some(wei),
        }
    }
}

/// A deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Registry key of the profile. Filled in by the registry.
    #[serde(skip)]
    pub name: String,
    pub chain_id: u64,
    /// JSON-RPC endpoint. In-process networks have none and cannot be deployed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Upper bound of the confirmation wait, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub gas_price: GasPricePolicy,
    /// Blocks (inclusive of the inclusion block) required before a receipt counts as confirmed.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Explorer URL template containing `{address}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl NetworkProfile {
    /// Create a profile with default timeout, gas price policy and confirmations.
    pub fn new(name: impl Into<String>, chain_id: u64, rpc_url: Option<Url>) -> Self {
        Self {
            name: name.into(),
            chain_id,
            rpc_url,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            gas_price: GasPricePolicy::Node,
            confirmations: DEFAULT_CONFIRMATIONS,
            explorer_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_gas_price(mut self, gas_price: GasPricePolicy) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_explorer_url(mut self, template: impl Into<String>) -> Self {
        self.explorer_url = Some(template.into());
        self
    }

    /// The confirmation wait bound.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The RPC endpoint, or an error for in-process networks.
    pub fn require_rpc_url(&self) -> Result<&Url> {
        self.rpc_url.as_ref().with_context(|| {
            format!(
                "Network '{}' has no rpc_url and cannot be deployed to",
                self.name
            )
        })
    }

    /// Explorer link for `address`, when this profile has an explorer.
    pub fn explorer_url_for(&self, address: &Address) -> Option<String> {
        self.explorer_url.as_ref().map(|template| {
            template.replace(EXPLORER_ADDRESS_PLACEHOLDER, &address.to_checksum(None))
        })
    }

    /// Reject profiles that cannot drive a deployment run.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("Network '{}' has a zero timeout_ms", self.name);
        }
        if self.confirmations == 0 {
            anyhow::bail!("Network '{}' requires at least one confirmation", self.name);
        }
        if let Some(template) = &self.explorer_url {
            if !template.contains(EXPLORER_ADDRESS_PLACEHOLDER) {
                anyhow::bail!(
                    "Network '{}' explorer_url must contain {}",
                    self.name,
                    EXPLORER_ADDRESS_PLACEHOLDER
                );
            }
        }
        Ok(())
    }
}

/// Named network profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkProfile>,
}

impl NetworkRegistry {
    /// The profiles available without any configuration file.
    pub fn builtin() -> Self {
        let profiles = [
            NetworkProfile::new("hardhat", 1337, None),
            NetworkProfile::new(
                "localhost",
                1337,
                Some(Url::parse("http://127.0.0.1:8545").expect("static URL is valid")),
            ),
            NetworkProfile::new(
                "core_testnet2",
                1115,
                Some(Url::parse("https://rpc.test2.btcs.network").expect("static URL is valid")),
            )
            .with_gas_price(GasPricePolicy::Fixed(20_000_000_000))
            .with_explorer_url("https://scan.test2.btcs.network/address/{address}"),
        ];

        Self {
            networks: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
        }
    }

    /// Default location of the user-level networks file.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chainship").join(NETWORKS_FILENAME))
    }

    /// Layered configuration: built-ins, then the networks file, then the environment.
    ///
    /// Without an explicit path, the user-level file and `./networks.toml` are both merged when
    /// present, the latter taking precedence.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::builtin()));

        match config_path {
            Some(path) => figment = figment.merge(Toml::file_exact(path)),
            None => {
                if let Some(path) = Self::default_config_path() {
                    figment = figment.merge(Toml::file(path));
                }
                figment = figment.merge(Toml::file(NETWORKS_FILENAME));
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the registry, see [`NetworkRegistry::figment`].
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("Networks file not found: {}", path.display());
            }
        }

        let registry = Self::extract(Self::figment(config_path))?;

        tracing::debug!(
            networks = ?registry.networks.keys().collect::<Vec<_>>(),
            "Network profiles loaded"
        );

        Ok(registry)
    }

    /// Extract a registry from any figment, naming each profile after its key.
    pub fn extract(figment: Figment) -> Result<Self> {
        let mut registry: Self = figment
            .extract()
            .context("Failed to parse network profiles")?;

        for (name, profile) in registry.networks.iter_mut() {
            profile.name = name.clone();
        }

        Ok(registry)
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Result<&NetworkProfile> {
        let profile = self.networks.get(name).with_context(|| {
            format!(
                "Unknown network '{}' (configured: {})",
                name,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?;
        profile.validate()?;
        Ok(profile)
    }
}
