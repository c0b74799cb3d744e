use crate::metrics::{
    backlog_metrics, exclusion_metrics, failure_metrics, BacklogMetrics, ClaimMetrics,
    ExclusionMetrics, FailureMetrics,
};

use alloy_primitives::U256;
use postman_primitives::{
    ClaimFailure, ClaimReceipt, Direction, ExclusionReason, Message, MessageStatus,
};
use std::collections::HashMap;

/// The economics of a successful claim.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClaimEconomics {
    /// The gas cost of the claim, in wei.
    pub gas_spent: U256,
    /// The part of the gas cost the message fee did not cover, in wei.
    pub sponsorship_fee: U256,
    /// The fee minus the gas cost, in wei. Negative when the claim was sponsored.
    pub fee_margin: i128,
}

impl ClaimEconomics {
    /// Returns the economics of the claim of a message paying `fee`.
    pub fn new(fee: U256, receipt: &ClaimReceipt) -> Self {
        let gas_spent = U256::from(receipt.gas_used) * U256::from(receipt.effective_gas_price);
        let sponsorship_fee = gas_spent.saturating_sub(fee);
        let fee_margin = if fee >= gas_spent {
            i128::try_from(fee - gas_spent).unwrap_or(i128::MAX)
        } else {
            i128::try_from(sponsorship_fee).map_or(i128::MIN, |v| -v)
        };
        Self { gas_spent, sponsorship_fee, fee_margin }
    }
}

fn wei(value: U256) -> f64 {
    value.saturating_to::<u128>() as f64
}

/// Records the outcomes of the pipeline of a direction.
///
/// Recording never fails: an unset recorder simply discards the values.
#[derive(Debug, Clone)]
pub struct EconomicsRecorder {
    claims: ClaimMetrics,
    exclusions: HashMap<ExclusionReason, ExclusionMetrics>,
    failures: HashMap<ClaimFailure, FailureMetrics>,
    backlog: HashMap<MessageStatus, BacklogMetrics>,
}

impl EconomicsRecorder {
    /// Returns a new recorder for the direction.
    pub fn new(direction: Direction) -> Self {
        Self {
            claims: ClaimMetrics::new_with_labels(&[("direction", direction.to_string())]),
            exclusions: exclusion_metrics(direction),
            failures: failure_metrics(direction),
            backlog: backlog_metrics(direction),
        }
    }

    /// Records a successful claim.
    pub fn record_claim(&self, message: &Message, receipt: &ClaimReceipt, now: u64) {
        let economics = ClaimEconomics::new(message.fee, receipt);
        self.claims.claimed.increment(1);
        self.claims.gas_spent.record(wei(economics.gas_spent));
        self.claims.sponsorship_fee.record(wei(economics.sponsorship_fee));
        self.claims.fee_margin.record(economics.fee_margin as f64);
        if let Some(broadcasted_at) = message.claim_tx_broadcasted_at {
            self.claims.claim_latency.record(now.saturating_sub(broadcasted_at) as f64);
        }
        self.claims.delivery_latency.record(now.saturating_sub(message.created_at) as f64);

        tracing::info!(
            target: "postman::claimer",
            hash = ?message.message_hash,
            transaction_hash = ?receipt.transaction_hash,
            gas_spent = %economics.gas_spent,
            sponsorship_fee = %economics.sponsorship_fee,
            fee_margin = economics.fee_margin,
            "Message claimed."
        );
    }

    /// Records a message found claimed by someone else.
    pub fn record_claimed_external(&self) {
        self.claims.claimed_external.increment(1);
    }

    /// Records a validation exclusion.
    pub fn record_exclusion(&self, reason: ExclusionReason) {
        if let Some(metrics) = self.exclusions.get(&reason) {
            metrics.excluded.increment(1);
        }
    }

    /// Records a failed claim.
    pub fn record_failure(&self, failure: ClaimFailure) {
        if let Some(metrics) = self.failures.get(&failure) {
            metrics.failed.increment(1);
        }
    }

    /// Records a failed claim sent back to `READY`.
    pub fn record_retry(&self) {
        self.claims.retried.increment(1);
    }

    /// Records a message abandoned after too many failed claims.
    pub fn record_terminal(&self) {
        self.claims.terminal.increment(1);
    }

    /// Records a broadcast claim transaction.
    pub fn record_broadcast(&self) {
        self.claims.broadcasts.increment(1);
    }

    /// Records a broadcast refused by the node.
    pub fn record_rejected_broadcast(&self) {
        self.claims.rejected_broadcasts.increment(1);
    }

    /// Sets the backlog gauges. Statuses missing from `counts` hold no message.
    pub fn record_backlog(&self, counts: &[(MessageStatus, u64)]) {
        for (status, metrics) in &self.backlog {
            let count = counts.iter().find(|(s, _)| s == status).map_or(0, |(_, count)| *count);
            metrics.backlog.set(count as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn receipt(gas_used: u64, effective_gas_price: u128) -> ClaimReceipt {
        ClaimReceipt {
            transaction_hash: B256::ZERO,
            block_number: 1,
            success: true,
            gas_used,
            effective_gas_price,
        }
    }

    #[test]
    fn test_profitable_claim() {
        let economics = ClaimEconomics::new(U256::from(1_500), &receipt(100, 10));

        assert_eq!(economics.gas_spent, U256::from(1_000));
        assert_eq!(economics.sponsorship_fee, U256::ZERO);
        assert_eq!(economics.fee_margin, 500);
    }

    #[test]
    fn test_sponsored_claim() {
        let economics = ClaimEconomics::new(U256::ZERO, &receipt(100, 10));

        assert_eq!(economics.sponsorship_fee, U256::from(1_000));
        assert_eq!(economics.fee_margin, -1_000);
    }

    #[test]
    fn test_recording_without_recorder_is_a_noop() {
        let recorder = EconomicsRecorder::new(Direction::L2ToL1);
        recorder.record_exclusion(ExclusionReason::Underpriced);
        recorder.record_failure(ClaimFailure::Dropped);
        recorder.record_backlog(&[(MessageStatus::Ready, 3)]);
    }
}
