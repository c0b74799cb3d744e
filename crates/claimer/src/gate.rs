//! The validation gate decides whether an anchored message is worth claiming.

use crate::{
    metrics::{ClaimerTask, TaskMetrics},
    ClaimPayloadBuilder, ClaimerError, EconomicsRecorder, GasFeeEstimator, GateConfig,
};

use alloy_primitives::{Address, U256};
use postman_db::{Database, DatabaseOperations, MessageTransition};
use postman_primitives::{
    ExclusionReason, GasFees, Message, MessageStatus, OnChainMessageStatus, RateLimitState,
};
use postman_providers::{
    ChainLogSource, FeeHistorySource, MessageServiceClient, ProviderError, RevertReason,
};
use std::{sync::Arc, time::Instant};

/// The outcome of the validation of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// The message can be claimed.
    Ready {
        /// The claim gas estimate.
        gas_limit: u64,
        /// The claim calldata size.
        size: u64,
        /// The fee paid per unit of gas.
        fee_per_gas: u64,
    },
    /// The message is not claimed for the provided reason.
    Excluded(ExclusionReason),
    /// The message has already been claimed on the destination chain.
    ClaimedExternal,
    /// The message cannot be evaluated yet.
    Deferred,
}

impl GateVerdict {
    fn transition(&self) -> Option<MessageTransition> {
        match *self {
            Self::Ready { gas_limit, size, fee_per_gas } => {
                Some(MessageTransition::ready(gas_limit, size, fee_per_gas))
            }
            Self::Excluded(reason) => Some(MessageTransition::excluded(reason)),
            Self::ClaimedExternal => Some(MessageTransition::to(MessageStatus::ClaimedExternal)),
            Self::Deferred => None,
        }
    }
}

/// The summary of a tick of the [`ValidationGate`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateSummary {
    /// Messages moved to `READY`.
    pub ready: usize,
    /// Messages moved to `EXCLUDED`.
    pub excluded: usize,
    /// Messages moved to `CLAIMED_EXTERNAL`.
    pub claimed_external: usize,
    /// Messages left `ANCHORED`.
    pub deferred: usize,
}

/// Scales `value` by `factor`, with a precision of a millionth.
pub(crate) fn scale(value: U256, factor: f64) -> U256 {
    const PRECISION: u64 = 1_000_000;
    let factor = (factor.max(0.0) * PRECISION as f64).round() as u64;
    value.saturating_mul(U256::from(factor)) / U256::from(PRECISION)
}

/// Validates anchored messages and moves them to `READY`, `EXCLUDED` or `CLAIMED_EXTERNAL`.
#[derive(Debug)]
pub struct ValidationGate<C, F> {
    /// The destination message service.
    client: C,
    /// The destination fee estimator.
    fees: GasFeeEstimator<F>,
    /// The claim payload builder, used to simulate the claim.
    payload: ClaimPayloadBuilder,
    /// The address claims are simulated from.
    claimer: Address,
    /// A reference to the database.
    database: Arc<Database>,
    /// The gate configuration.
    config: GateConfig,
    /// The economics recorder.
    recorder: EconomicsRecorder,
    /// The tick metrics.
    metrics: TaskMetrics,
}

impl<C, F> ValidationGate<C, F>
where
    C: MessageServiceClient,
    F: ChainLogSource + FeeHistorySource,
{
    /// Returns a new [`ValidationGate`].
    pub fn new(
        client: C,
        fees: GasFeeEstimator<F>,
        payload: ClaimPayloadBuilder,
        claimer: Address,
        database: Arc<Database>,
        config: GateConfig,
    ) -> Self {
        let recorder = EconomicsRecorder::new(config.direction);
        let metrics = TaskMetrics::for_task(ClaimerTask::Gate, config.direction);
        Self { client, fees, payload, claimer, database, config, recorder, metrics }
    }

    /// Validates the next batch of anchored messages.
    #[tracing::instrument(target = "postman::claimer", skip_all, fields(direction = %self.config.direction))]
    pub async fn tick(&mut self) -> Result<GateSummary, ClaimerError> {
        let now = Instant::now();
        let result = self.validate_anchored().await;
        self.metrics.task_duration.record(now.elapsed().as_secs_f64());
        result
    }

    async fn validate_anchored(&mut self) -> Result<GateSummary, ClaimerError> {
        let mut summary = GateSummary::default();
        let messages = self
            .database
            .get_messages_by_status(
                self.config.direction,
                MessageStatus::Anchored,
                self.config.max_fetch_messages_from_db,
            )
            .await?;
        if messages.is_empty() {
            return Ok(summary);
        }

        let fees = self.fees.estimate().await?;
        let rate_limit = self.client.rate_limit().await?;

        for message in messages {
            let hash = message.message_hash;
            let verdict = match self.validate(&message, fees, rate_limit).await {
                Ok(verdict) => verdict,
                Err(err) => {
                    tracing::warn!(target: "postman::claimer", ?hash, %err, "Message validation deferred.");
                    GateVerdict::Deferred
                }
            };

            let Some(transition) = verdict.transition() else {
                summary.deferred += 1;
                continue;
            };
            let outcome =
                self.database.transition_message(hash, MessageStatus::Anchored, transition).await?;
            if !outcome.is_applied() {
                tracing::debug!(target: "postman::claimer", ?hash, "Message validated concurrently.");
                continue;
            }

            match verdict {
                GateVerdict::Ready { gas_limit, fee_per_gas, .. } => {
                    tracing::debug!(target: "postman::claimer", ?hash, gas_limit, fee_per_gas, "Message ready to be claimed.");
                    summary.ready += 1;
                }
                GateVerdict::Excluded(reason) => {
                    tracing::info!(target: "postman::claimer", ?hash, %reason, "Message excluded.");
                    self.recorder.record_exclusion(reason);
                    summary.excluded += 1;
                }
                GateVerdict::ClaimedExternal => {
                    tracing::info!(target: "postman::claimer", ?hash, "Message already claimed.");
                    self.recorder.record_claimed_external();
                    summary.claimed_external += 1;
                }
                GateVerdict::Deferred => {}
            }
        }

        Ok(summary)
    }

    /// Validates a message against the on-chain status and the economic and risk checks.
    pub async fn validate(
        &self,
        message: &Message,
        fees: GasFees,
        rate_limit: Option<RateLimitState>,
    ) -> Result<GateVerdict, ProviderError> {
        match self.client.claim_status(message).await? {
            OnChainMessageStatus::Claimed => return Ok(GateVerdict::ClaimedExternal),
            OnChainMessageStatus::Unknown => return Ok(GateVerdict::Deferred),
            OnChainMessageStatus::Claimable => {}
        }

        let has_zero_fee = message.fee.is_zero();
        if has_zero_fee && !self.config.is_postman_sponsorship_enabled {
            return Ok(GateVerdict::Excluded(ExclusionReason::ZeroFee));
        }
        if self.config.reserved_recipients.contains(&message.recipient) {
            return Ok(GateVerdict::Excluded(ExclusionReason::ReservedRecipient));
        }

        let payload = self.payload.build(&self.client, message).await?;
        let size = payload.size();
        let gas_limit =
            match self.client.estimate_claim_gas(self.claimer, payload.to, payload.input).await {
                Ok(gas_limit) => gas_limit,
                Err(ProviderError::Reverted(RevertReason::RateLimitExceeded)) => {
                    return Ok(GateVerdict::Excluded(ExclusionReason::RateLimited))
                }
                Err(ProviderError::Reverted(RevertReason::MessageAlreadyClaimed)) => {
                    return Ok(GateVerdict::ClaimedExternal)
                }
                Err(ProviderError::Reverted(RevertReason::Other(data))) => {
                    tracing::debug!(target: "postman::claimer", hash = ?message.message_hash, %data, "Claim simulation reverted.");
                    return Ok(GateVerdict::Excluded(ExclusionReason::SimulationReverted));
                }
                Err(err) => return Err(err),
            };

        if gas_limit > self.config.max_claim_gas_limit {
            return Ok(GateVerdict::Excluded(ExclusionReason::GasLimitExceeded));
        }

        if has_zero_fee {
            if gas_limit > self.config.max_postman_sponsor_gas_limit {
                return Ok(GateVerdict::Excluded(ExclusionReason::ZeroFee));
            }
        } else {
            let cost = U256::from(gas_limit) * U256::from(fees.max_fee_per_gas);
            if message.fee < scale(cost, 1.0 + self.config.profit_margin) {
                return Ok(GateVerdict::Excluded(ExclusionReason::Underpriced));
            }
        }

        if let Some(rate_limit) = rate_limit {
            let amount = rate_limit.current_period_amount + message.fee + message.value;
            if amount > scale(rate_limit.limit, self.config.rate_limit_margin) {
                return Ok(GateVerdict::Excluded(ExclusionReason::RateLimited));
            }
        }

        let fee_per_gas = (message.fee / U256::from(gas_limit.max(1))).saturating_to::<u64>();
        Ok(GateVerdict::Ready { gas_limit, size, fee_per_gas })
    }
}
