//! The `deploy` command.

use std::process::ExitCode;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chainship_deploy::{
    DeploymentExecutor, DeploymentOutcome, DeploymentRecorder, DeploymentRequest, HardhatArtifact,
    JsonRpcLedger, Ledger, LocalKeyIdentity, NetworkProfile, NetworkRegistry, SigningIdentity,
    TracingObserver, UnlockedIdentity,
};

use crate::cli::DeployArgs;
use crate::summary;

/// Resolve the configuration, run one deployment and emit its record.
///
/// Errors returned here are configuration errors: the deployment never started.
pub async fn run(args: DeployArgs) -> Result<ExitCode> {
    let registry = NetworkRegistry::load(args.networks_config.as_deref())?;
    let network = registry.get(&args.network)?.clone();
    let ledger = JsonRpcLedger::new(network.require_rpc_url()?.clone())?;

    let chain_id = ledger
        .chain_id()
        .await
        .with_context(|| format!("Failed to reach network '{}'", network.name))?;
    if chain_id != network.chain_id {
        anyhow::bail!(
            "Network '{}' expects chain id {} but the node reports {}",
            network.name,
            network.chain_id,
            chain_id
        );
    }

    let artifact = load_artifact(&args)?;

    tracing::info!(
        network = %network.name,
        chain_id,
        rpc_url = %ledger.url(),
        "Network configuration resolved"
    );

    match Signer::from_args(&args) {
        Signer::Unlocked(address) => {
            let identity = UnlockedIdentity::new(address, ledger.clone())
                .with_gas_price(network.gas_price);
            deploy(ledger, network, identity, artifact, &args).await
        }
        Signer::LocalKey(private_key) => {
            let identity = LocalKeyIdentity::from_private_key(
                private_key,
                network.chain_id,
                network.gas_price,
                ledger.clone(),
            )?;
            deploy(ledger, network, identity, artifact, &args).await
        }
        Signer::FirstAccount => {
            let identity = UnlockedIdentity::first_account(ledger.clone())
                .await?
                .with_gas_price(network.gas_price);
            deploy(ledger, network, identity, artifact, &args).await
        }
    }
}

/// Which account signs the deployment.
#[derive(Debug, PartialEq, Eq)]
enum Signer<'a> {
    Unlocked(Address),
    LocalKey(&'a str),
    FirstAccount,
}

impl<'a> Signer<'a> {
    /// An explicit `--from` wins over a private key, which may come from the environment.
    fn from_args(args: &'a DeployArgs) -> Self {
        match (args.from, args.private_key.as_deref()) {
            (Some(address), _) => Self::Unlocked(address),
            (None, Some(private_key)) => Self::LocalKey(private_key),
            (None, None) => Self::FirstAccount,
        }
    }
}

fn load_artifact(args: &DeployArgs) -> Result<HardhatArtifact> {
    let artifact = match (&args.artifact, &args.contract) {
        (Some(path), _) => HardhatArtifact::load(path)?,
        (None, Some(contract)) => HardhatArtifact::find(&args.artifacts_dir, contract)?,
        (None, None) => anyhow::bail!("Either --artifact or --contract is required"),
    };

    match &args.verify_call {
        Some(signature) => artifact.with_verification_call(signature),
        None => Ok(artifact),
    }
}

async fn deploy<I: SigningIdentity>(
    ledger: JsonRpcLedger,
    network: NetworkProfile,
    identity: I,
    artifact: HardhatArtifact,
    args: &DeployArgs,
) -> Result<ExitCode> {
    let executor = DeploymentExecutor::new(ledger).with_observer(TracingObserver);
    let request = DeploymentRequest::new(artifact, network, identity, args.constructor_args.clone());

    let outcome = executor.run(&request).await;

    let recorder = DeploymentRecorder;
    let record = recorder.record(&outcome);
    recorder.emit(&record, &mut std::io::stdout(), &mut std::io::stderr())?;

    if let DeploymentOutcome::Success(success) = &outcome {
        if let Some(path) = &args.out {
            recorder.save(&record, path)?;
        }
        eprintln!("{}", summary::deployment_table(success));
        eprintln!("{}", summary::next_steps(success));
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
