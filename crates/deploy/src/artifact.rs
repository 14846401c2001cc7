//! Hardhat compilation artifacts and the post-deploy verification probe.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_core::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_core::json_abi::{Function, JsonAbi, StateMutability};
use alloy_core::primitives::{Bytes, U256};
use anyhow::{Context, Result};
use derive_more::{Deref, From};
use serde::Deserialize;

use crate::ArtifactProvider;

/// Marker left in bytecode by the compiler for unlinked libraries.
const LIBRARY_PLACEHOLDER: &str = "__$";

/// ABI-encoded constructor arguments, appended to the creation bytecode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, From)]
pub struct ConstructorArgs(Bytes);

impl FromStr for ConstructorArgs {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = Bytes::from_str(s)
            .with_context(|| format!("Constructor arguments are not valid hex: '{}'", s))?;
        Ok(Self(bytes))
    }
}

/// On-disk layout of a Hardhat artifact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    contract_name: String,
    abi: JsonAbi,
    bytecode: String,
}

/// A zero-argument read-only call whose outputs are unsigned integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCall {
    function: Function,
    calldata: Bytes,
}

impl VerificationCall {
    /// Resolve `signature` (`getPlatformStats()` or `getPlatformStats`) against `abi`.
    pub fn new(signature: &str, abi: &JsonAbi) -> Result<Self> {
        let signature = signature.trim();
        let (name, args) = match signature.split_once('(') {
            Some((name, rest)) => (name, rest.strip_suffix(')').with_context(|| {
                format!("Malformed function signature: '{}'", signature)
            })?),
            None => (signature, ""),
        };

        if name.is_empty() {
            anyhow::bail!("Malformed function signature: '{}'", signature);
        }
        if !args.trim().is_empty() {
            anyhow::bail!(
                "Verification call '{}' takes arguments; only zero-argument calls are supported",
                signature
            );
        }

        let function = abi
            .function(name)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.is_empty()))
            .with_context(|| format!("Function {}() not found in contract ABI", name))?;

        if !matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            anyhow::bail!("Function {}() is not a view or pure function", name);
        }

        for output in &function.outputs {
            let ty = output
                .resolve()
                .with_context(|| format!("Unsupported outputs for {}()", name))?;
            if !matches!(ty, DynSolType::Uint(_)) {
                anyhow::bail!(
                    "Unsupported outputs for {}(): '{}' is not an unsigned integer type",
                    name,
                    output.ty
                );
            }
        }

        Ok(Self {
            calldata: Bytes::copy_from_slice(function.selector().as_slice()),
            function: function.clone(),
        })
    }

    /// Canonical signature, e.g. `getPlatformStats()`.
    pub fn signature(&self) -> String {
        self.function.signature()
    }

    /// Selector-only calldata.
    pub fn calldata(&self) -> &Bytes {
        &self.calldata
    }

    /// Decode the returned data into one reading per declared output.
    pub fn decode(&self, output: &Bytes) -> Result<Vec<U256>> {
        let values = self
            .function
            .abi_decode_output(output, true)
            .with_context(|| format!("Failed to decode {} output", self.signature()))?;

        values
            .into_iter()
            .map(|value| match value {
                DynSolValue::Uint(reading, _) => Ok(reading),
                other => anyhow::bail!(
                    "{} returned a non-integer value: {:?}",
                    self.signature(),
                    other
                ),
            })
            .collect()
    }
}

/// A compiled contract read from a Hardhat artifact file.
#[derive(Debug, Clone)]
pub struct HardhatArtifact {
    contract_name: String,
    abi: JsonAbi,
    bytecode: Bytes,
    verification: Option<VerificationCall>,
}

impl HardhatArtifact {
    /// Load an artifact from its JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid artifact {}", path.display()))
    }

    /// Locate `contract` under a Hardhat artifacts directory and load it.
    ///
    /// Looks at `<dir>/contracts/<Name>.sol/<Name>.json` first, then anywhere below `dir`.
    pub fn find(artifacts_dir: impl AsRef<Path>, contract: &str) -> Result<Self> {
        let artifacts_dir = artifacts_dir.as_ref();
        let file_name = format!("{}.json", contract);

        let conventional = artifacts_dir
            .join("contracts")
            .join(format!("{}.sol", contract))
            .join(&file_name);

        let path = if conventional.is_file() {
            conventional
        } else {
            find_file(artifacts_dir, &file_name)?.with_context(|| {
                format!(
                    "Artifact for contract '{}' not found under {}",
                    contract,
                    artifacts_dir.display()
                )
            })?
        };

        tracing::debug!(path = %path.display(), contract, "Artifact located");

        Self::load(path)
    }

    /// Parse an artifact from its JSON content.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ArtifactFile =
            serde_json::from_str(content).context("Failed to parse artifact JSON")?;

        if file.bytecode.contains(LIBRARY_PLACEHOLDER) {
            anyhow::bail!(
                "Contract '{}' references unlinked libraries; deploy and link them first",
                file.contract_name
            );
        }

        let bytecode = Bytes::from_str(&file.bytecode)
            .with_context(|| format!("Bytecode of '{}' is not valid hex", file.contract_name))?;

        if bytecode.is_empty() {
            anyhow::bail!(
                "Contract '{}' has no bytecode (abstract contract or interface?)",
                file.contract_name
            );
        }

        Ok(Self {
            contract_name: file.contract_name,
            abi: file.abi,
            bytecode,
            verification: None,
        })
    }

    /// Probe the deployed contract with `signature` once it is confirmed.
    pub fn with_verification_call(mut self, signature: &str) -> Result<Self> {
        self.verification = Some(VerificationCall::new(signature, &self.abi)?);
        Ok(self)
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }
}

impl ArtifactProvider for HardhatArtifact {
    fn name(&self) -> &str {
        &self.contract_name
    }

    fn encode_deployment(&self, constructor_args: &ConstructorArgs) -> Result<Bytes> {
        match (self.abi.constructor(), constructor_args.is_empty()) {
            (Some(constructor), true) if !constructor.inputs.is_empty() => anyhow::bail!(
                "Constructor of '{}' takes {} argument(s) but none were given",
                self.contract_name,
                constructor.inputs.len()
            ),
            (Some(constructor), false) if !constructor.inputs.is_empty() => {
                constructor
                    .abi_decode_input(constructor_args, true)
                    .with_context(|| {
                        format!(
                            "Constructor arguments do not match the constructor of '{}'",
                            self.contract_name
                        )
                    })?;
            }
            (_, false) => anyhow::bail!("Constructor of '{}' takes no arguments", self.contract_name),
            (_, true) => {}
        }

        let mut payload = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        payload.extend_from_slice(&self.bytecode);
        payload.extend_from_slice(constructor_args);
        Ok(payload.into())
    }

    fn verification_call(&self) -> Option<&VerificationCall> {
        self.verification.as_ref()
    }
}

/// Depth-first search for `file_name` below `dir`, skipping Hardhat's build-info directory.
fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();

        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == "build-info") {
                continue;
            }
            if let Some(found) = find_file(&path, file_name)? {
                return Ok(Some(found));
            }
        } else if path.file_name().is_some_and(|name| name == file_name) {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
