//! The deployment state machine.
//!
//! A run goes through preflight, gas planning, submission, confirmation, address resolution
//! and verification, strictly in that order. Each fatal step is classified into a
//! [`FailureStage`] at this boundary; verification only ever downgrades the success record.
//! Nothing is retried here: a caller wanting another attempt starts a new run.

use std::str::FromStr;

use alloy_core::primitives::{Address, B256, U256};

use crate::{
    ArtifactProvider, ConfirmationError, ConstructorArgs, DeploymentFailure, DeploymentObserver,
    DeploymentOutcome, DeploymentState, DeploymentStep, DeploymentSuccess, FailureStage,
    GasEstimator, Ledger, LifecycleEvent, NetworkProfile, SigningIdentity, TransactionReceipt,
    VerificationResult,
};

/// Inputs of one deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentRequest<I, A> {
    pub artifact: A,
    pub network: NetworkProfile,
    pub identity: I,
    pub constructor_args: ConstructorArgs,
}

impl<I, A> DeploymentRequest<I, A> {
    pub fn new(
        artifact: A,
        network: NetworkProfile,
        identity: I,
        constructor_args: ConstructorArgs,
    ) -> Self {
        Self {
            artifact,
            network,
            identity,
            constructor_args,
        }
    }
}

/// Drives deployment runs against one ledger.
pub struct DeploymentExecutor<L> {
    ledger: L,
    observers: Vec<Box<dyn DeploymentObserver>>,
}

impl<L: Ledger> DeploymentExecutor<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            observers: Vec::new(),
        }
    }

    /// Register an observer of lifecycle events.
    pub fn with_observer(mut self, observer: impl DeploymentObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run one deployment to its terminal state.
    ///
    /// # Arguments
    /// * `request` - The artifact, target network, identity and constructor arguments
    ///
    /// # Returns
    /// A [`DeploymentOutcome`]. This never fails: every error is classified into a
    /// [`FailureStage`] and observers see a [`LifecycleEvent::Finished`] event last.
    pub async fn run<I, A>(&self, request: &DeploymentRequest<I, A>) -> DeploymentOutcome
    where
        I: SigningIdentity,
        A: ArtifactProvider,
    {
        tracing::info!(
            network = %request.network.name,
            chain_id = request.network.chain_id,
            contract = request.artifact.name(),
            deployer = %request.identity.address(),
            "Starting deployment..."
        );

        let mut state = DeploymentState::Idle;
        let outcome = match self.execute(request, &mut state).await {
            Ok(success) => success.into(),
            Err(failure) => DeploymentOutcome::Failure(failure),
        };
        debug_assert!(state.is_terminal(), "run ended in {}", state);

        self.emit(LifecycleEvent::Finished(state));
        outcome
    }

    async fn execute<I, A>(
        &self,
        request: &DeploymentRequest<I, A>,
        state: &mut DeploymentState,
    ) -> Result<DeploymentSuccess, DeploymentFailure>
    where
        I: SigningIdentity,
        A: ArtifactProvider,
    {
        let network = &request.network;
        let deployer = request.identity.address();

        // Idle -> PreflightChecked
        self.emit(LifecycleEvent::StepEntered(DeploymentStep::Preflight));
        let balance = self
            .ledger
            .balance(deployer)
            .await
            .map_err(|e| {
                self.fail(state, DeploymentFailure::from_error(FailureStage::PreflightBalance, &e))
            })?;
        if balance == U256::ZERO {
            return Err(self.fail(
                state,
                DeploymentFailure::new(
                    FailureStage::PreflightBalance,
                    format!("Deployer account {} has no funds on {}", deployer, network.name),
                ),
            ));
        }
        tracing::info!(%deployer, %balance, "Deployer balance (wei)");
        self.advance(state, DeploymentStep::Preflight);

        // PreflightChecked -> GasPlanned
        self.emit(LifecycleEvent::StepEntered(DeploymentStep::GasEstimation));
        let payload = request
            .artifact
            .encode_deployment(&request.constructor_args)
            .map_err(|e| {
                let e = e.context("Failed to encode deployment payload");
                self.fail(state, DeploymentFailure::from_error(FailureStage::GasEstimation, &e))
            })?;
        let plan = GasEstimator::new(&self.ledger)
            .estimate(&payload, deployer)
            .await
            .map_err(|e| {
                self.fail(state, DeploymentFailure::from_error(FailureStage::GasEstimation, &e))
            })?;
        tracing::info!(
            estimated_gas = plan.estimated_units,
            gas_limit = plan.buffered_limit,
            "Estimated gas for deployment"
        );
        self.advance(state, DeploymentStep::GasEstimation);

        // GasPlanned -> Submitted
        self.emit(LifecycleEvent::StepEntered(DeploymentStep::Submission));
        let handle = request
            .identity
            .authorize_and_submit(&payload, plan.buffered_limit)
            .await
            .map_err(|e| {
                self.fail(state, DeploymentFailure::from_error(FailureStage::Submission, &e))
            })?;
        tracing::info!(tx_hash = %handle.hash, nonce = ?handle.nonce, "Deployment transaction submitted");
        self.advance(state, DeploymentStep::Submission);

        // Submitted -> Confirmed
        self.emit(LifecycleEvent::StepEntered(DeploymentStep::Confirmation));
        let timeout = network.timeout();
        let confirmed = tokio::time::timeout(
            timeout,
            self.ledger
                .await_confirmation(&handle, timeout, network.confirmations),
        )
        .await
        .unwrap_or(Err(ConfirmationError::Timeout {
            hash: handle.hash,
            timeout,
        }));
        let receipt = match confirmed {
            Ok(receipt) if receipt.status == Some(false) => Err(ConfirmationError::Reverted {
                hash: receipt.transaction_hash,
                block_number: receipt.block_number,
            }),
            other => other,
        }
        .map_err(|e| {
            let e = anyhow::Error::from(e);
            self.fail(state, DeploymentFailure::from_error(FailureStage::ConfirmationWait, &e))
        })?;
        self.advance(state, DeploymentStep::Confirmation);

        // Confirmed -> Verified: the address must be known, the probe may fail.
        self.emit(LifecycleEvent::StepEntered(DeploymentStep::AddressResolution));
        let contract_address = resolve_address(&receipt, handle.hash)
            .map_err(|cause| {
                self.fail(state, DeploymentFailure::new(FailureStage::AddressResolution, cause))
            })?;
        self.emit(LifecycleEvent::StepSucceeded {
            step: DeploymentStep::AddressResolution,
            state: *state,
        });
        tracing::info!(
            %contract_address,
            tx_hash = %receipt.transaction_hash,
            block_number = ?receipt.block_number,
            "Contract deployed"
        );

        self.emit(LifecycleEvent::StepEntered(DeploymentStep::Verification));
        let verification = self.verify(&request.artifact, contract_address).await;
        *state = DeploymentState::Verified;
        match &verification {
            VerificationResult::Confirmed(_) => self.emit(LifecycleEvent::StepSucceeded {
                step: DeploymentStep::Verification,
                state: *state,
            }),
            VerificationResult::Unavailable(reason) => self.emit(LifecycleEvent::StepFailed {
                step: DeploymentStep::Verification,
                cause: reason.clone(),
                state: *state,
            }),
        }

        // Verified -> Done
        *state = DeploymentState::Done;

        Ok(DeploymentSuccess {
            contract_address,
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            deployer_address: deployer,
            network_name: network.name.clone(),
            estimated_gas: plan.estimated_units,
            gas_limit: plan.buffered_limit,
            timestamp: chrono::Utc::now(),
            verification,
            explorer_url: network.explorer_url_for(&contract_address),
        })
    }

    /// Make the configured read-only call against the deployed contract.
    async fn verify<A: ArtifactProvider>(&self, artifact: &A, address: Address) -> VerificationResult {
        let Some(call) = artifact.verification_call() else {
            return VerificationResult::Unavailable("no verification call configured".to_string());
        };

        let readings = match self.ledger.call(address, call.calldata()).await {
            Ok(output) => call.decode(&output),
            Err(e) => Err(e.context(format!("{} failed", call.signature()))),
        };

        match readings {
            Ok(readings) => {
                tracing::info!(
                    call = %call.signature(),
                    readings = ?readings.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Contract verification succeeded"
                );
                VerificationResult::Confirmed(readings)
            }
            Err(e) => VerificationResult::Unavailable(format!("{:#}", e)),
        }
    }

    /// Move along the success path after `step`.
    fn advance(&self, state: &mut DeploymentState, step: DeploymentStep) {
        if let Some(next) = state.next() {
            *state = next;
        }
        self.emit(LifecycleEvent::StepSucceeded {
            step,
            state: *state,
        });
    }

    /// Abort the run with `failure`.
    fn fail(&self, state: &mut DeploymentState, failure: DeploymentFailure) -> DeploymentFailure {
        *state = DeploymentState::Failed(failure.stage);
        self.emit(LifecycleEvent::StepFailed {
            step: failure.stage.into(),
            cause: failure.cause.clone(),
            state: *state,
        });
        failure
    }

    fn emit(&self, event: LifecycleEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

/// The deployed address, from a receipt that must belong to the submitted transaction.
fn resolve_address(receipt: &TransactionReceipt, submitted: B256) -> Result<Address, String> {
    if receipt.transaction_hash != submitted {
        return Err(format!(
            "Receipt for {} does not match submitted transaction {}",
            receipt.transaction_hash, submitted
        ));
    }

    let raw = receipt
        .contract_address
        .as_deref()
        .ok_or_else(|| format!("Receipt of {} has no contract address", submitted))?;
    let address = Address::from_str(raw).map_err(|e| {
        format!(
            "Receipt of {} reports a malformed contract address '{}': {}",
            submitted, raw, e
        )
    })?;

    if address == Address::ZERO {
        return Err(format!(
            "Receipt of {} reports the zero address as contract address",
            submitted
        ));
    }
    Ok(address)
}
