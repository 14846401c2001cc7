use std::path::PathBuf;

use alloy_core::primitives::Address;
use chainship_deploy::ConstructorArgs;
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "chainship")]
#[command(
    author,
    version,
    about = "Deploy a compiled smart contract to a configured network and record where it lives"
)]
pub struct Cli {
    /// The verbosity level. Logs go to stderr.
    #[arg(short, long, global = true, env = "CHAINSHIP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract and print its deployment record on stdout.
    Deploy(DeployArgs),

    /// List the configured network profiles.
    Networks {
        /// Path to a networks TOML file layered over the built-in profiles.
        #[arg(long, env = "CHAINSHIP_NETWORKS_CONFIG")]
        networks_config: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["artifact", "contract"])
))]
pub struct DeployArgs {
    /// Name of the network profile to deploy to.
    #[arg(short, long, env = "CHAINSHIP_NETWORK")]
    pub network: String,

    /// Path to a Hardhat artifact JSON file.
    #[arg(long, env = "CHAINSHIP_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Name of the contract to look up under the artifacts directory.
    #[arg(short, long, env = "CHAINSHIP_CONTRACT")]
    pub contract: Option<String>,

    /// Hardhat artifacts directory searched by `--contract`.
    #[arg(long, env = "CHAINSHIP_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// ABI-encoded constructor arguments, hex.
    #[arg(long, env = "CHAINSHIP_CONSTRUCTOR_ARGS", default_value = "0x")]
    pub constructor_args: ConstructorArgs,

    /// Zero-argument view function called once the contract is deployed, e.g. `getPlatformStats()`.
    #[arg(long, env = "CHAINSHIP_VERIFY_CALL")]
    pub verify_call: Option<String>,

    /// Hex-encoded private key of the deployer.
    ///
    /// Without it, the deployment is sent from a node-managed account.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Node-managed account to deploy from. Takes precedence over `--private-key`.
    ///
    /// Defaults to the node's first account when no private key is given either.
    #[arg(long, env = "CHAINSHIP_FROM")]
    pub from: Option<Address>,

    /// Path to a networks TOML file layered over the built-in profiles.
    #[arg(long, env = "CHAINSHIP_NETWORKS_CONFIG")]
    pub networks_config: Option<PathBuf>,

    /// Also write the deployment record to this file.
    #[arg(short, long, env = "CHAINSHIP_OUT")]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "chainship",
            "deploy",
            "--network",
            "localhost",
            "--contract",
            "Project",
            "--verify-call",
            "getPlatformStats()",
        ])
        .unwrap();

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.network, "localhost");
        assert_eq!(args.contract.as_deref(), Some("Project"));
        assert_eq!(args.artifacts_dir, PathBuf::from("artifacts"));
        assert!(args.constructor_args.is_empty());
    }

    #[test]
    fn test_deploy_requires_an_artifact_source() {
        assert!(Cli::try_parse_from(["chainship", "deploy", "--network", "localhost"]).is_err());
    }

    #[test]
    fn test_private_key_and_from_together() {
        let cli = Cli::try_parse_from([
            "chainship",
            "deploy",
            "--network",
            "localhost",
            "--artifact",
            "Project.json",
            "--private-key",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "--from",
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
        ])
        .unwrap();

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.private_key.is_some());
        assert!(args.from.is_some());
    }
}
