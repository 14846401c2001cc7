//! Gas estimation with a fixed safety buffer.

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};

use crate::Ledger;

/// Buffer applied on top of the simulated gas, as a percentage of the estimate.
pub const GAS_BUFFER_PERCENT: u64 = 120;

/// Gas limit chosen for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    /// Raw units reported by the network simulation.
    pub estimated_units: u64,
    /// Limit the transaction is submitted with.
    pub buffered_limit: u64,
}

impl GasPlan {
    /// Buffer a raw estimate: `floor(units * 120 / 100)`, saturating at `u64::MAX`.
    pub fn from_estimate(estimated_units: u64) -> Self {
        let buffered = u128::from(estimated_units) * u128::from(GAS_BUFFER_PERCENT) / 100;
        Self {
            estimated_units,
            buffered_limit: u64::try_from(buffered).unwrap_or(u64::MAX),
        }
    }
}

/// Turns a deployment payload into a [`GasPlan`] using the network's simulation facility.
///
/// There is no fallback limit and no retry: a failed simulation is reported as is.
pub struct GasEstimator<'a, L> {
    ledger: &'a L,
}

impl<'a, L: Ledger> GasEstimator<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Estimate the gas needed to create a contract from `payload`, sent by `from`.
    ///
    /// # Arguments
    /// * `payload` - Creation bytecode with the constructor arguments appended
    /// * `from` - The deploying account
    ///
    /// # Returns
    /// The raw estimate and the buffered limit, see [`GasPlan::from_estimate`].
    pub async fn estimate(&self, payload: &Bytes, from: Address) -> Result<GasPlan> {
        let units = self
            .ledger
            .estimate_gas(from, payload)
            .await
            .context("Gas simulation failed")?;

        let plan = GasPlan::from_estimate(units);

        tracing::debug!(
            estimated_units = plan.estimated_units,
            buffered_limit = plan.buffered_limit,
            "Gas plan computed"
        );

        Ok(plan)
    }
}
