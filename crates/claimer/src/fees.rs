use crate::{ClaimerError, GasFeeConfig};

use postman_primitives::GasFees;
use postman_providers::{ChainLogSource, FeeHistorySource};

/// Estimates EIP-1559 fees from the recent fee history of the destination chain.
#[derive(Debug)]
pub struct GasFeeEstimator<F> {
    /// The destination chain.
    chain: F,
    /// The estimation configuration.
    config: GasFeeConfig,
    /// The last estimate along with the block it was computed at.
    cache: Option<(u64, GasFees)>,
}

impl<F: ChainLogSource + FeeHistorySource> GasFeeEstimator<F> {
    /// Returns a new [`GasFeeEstimator`].
    pub const fn new(chain: F, config: GasFeeConfig) -> Self {
        Self { chain, config, cache: None }
    }

    /// Returns the configured fee cap.
    pub const fn max_fee_per_gas_cap(&self) -> u128 {
        self.config.max_fee_per_gas_cap
    }

    /// Returns the fees to use for a claim at the current block.
    ///
    /// The max priority fee is the mean of the sampled rewards and the max fee is twice the next
    /// base fee plus the priority fee, capped at the configured cap. A priority fee above the cap
    /// is a misconfiguration and is returned as [`ClaimerError::PriorityFeeAboveCap`].
    pub async fn estimate(&mut self) -> Result<GasFees, ClaimerError> {
        let cap = self.config.max_fee_per_gas_cap;
        if self.config.enforce_max_gas_fee {
            return Ok(GasFees::new(cap, cap));
        }

        let block_number = self.chain.block_number().await?;
        if let Some((cached_block, fees)) = self.cache {
            if cached_block == block_number {
                return Ok(fees);
            }
        }

        let history =
            self.chain.fee_history(self.config.block_count, self.config.percentile).await?;
        let priority_fee = mean(&history.rewards);
        if priority_fee > cap {
            return Err(ClaimerError::PriorityFeeAboveCap { priority_fee, cap });
        }
        let max_fee =
            history.next_base_fee_per_gas.saturating_mul(2).saturating_add(priority_fee).min(cap);

        let fees = GasFees::new(max_fee, priority_fee);
        tracing::trace!(target: "postman::claimer", block_number, ?fees, "Estimated fees.");
        self.cache = Some((block_number, fees));
        Ok(fees)
    }
}

fn mean(values: &[u128]) -> u128 {
    if values.is_empty() {
        return 0;
    }
    values.iter().fold(0u128, |acc, v| acc.saturating_add(*v)) / values.len() as u128
}
