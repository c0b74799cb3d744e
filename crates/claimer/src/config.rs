use alloy_primitives::Address;
use postman_primitives::Direction;
use std::{collections::HashSet, time::Duration};

/// Configuration for the fee estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasFeeConfig {
    /// The number of blocks sampled from the fee history.
    pub block_count: u64,
    /// The reward percentile sampled from the fee history.
    pub percentile: f64,
    /// The maximum fee per gas the Postman pays.
    pub max_fee_per_gas_cap: u128,
    /// Whether both fees are set to the cap instead of being estimated.
    pub enforce_max_gas_fee: bool,
}

/// Configuration for the claim payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPayloadConfig {
    /// The recipient of the message fees, the zero address lets the claimer collect them.
    pub fee_recipient: Address,
    /// The contract claims are sent to instead of the message service.
    pub claim_via_address: Option<Address>,
}

/// Configuration for the [`crate::ValidationGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// The direction of the validated messages.
    pub direction: Direction,
    /// The maximum number of messages validated in a tick.
    pub max_fetch_messages_from_db: u64,
    /// The margin applied on top of the claim cost, `0.1` requires a fee 10% above the cost.
    pub profit_margin: f64,
    /// The maximum gas a claim can use.
    pub max_claim_gas_limit: u64,
    /// The share of the rate limit the Postman is allowed to consume.
    pub rate_limit_margin: f64,
    /// Whether zero fee messages are claimed at the Postman's expense.
    pub is_postman_sponsorship_enabled: bool,
    /// The maximum gas of a sponsored claim.
    pub max_postman_sponsor_gas_limit: u64,
    /// The recipients whose messages are never claimed.
    pub reserved_recipients: HashSet<Address>,
}

/// Configuration for the [`crate::ClaimSubmitter`].
#[derive(Debug, Clone, Copy)]
pub struct SubmitterConfig {
    /// The direction of the claimed messages.
    pub direction: Direction,
    /// The maximum number of claims broadcast in a tick.
    pub max_claims_per_tick: u64,
    /// The fee increase, in percent, of a transaction replacing a pending one.
    pub price_bump_percent: u64,
}

/// Configuration for the [`crate::Reconciler`].
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// The direction of the reconciled messages.
    pub direction: Direction,
    /// The maximum number of messages per status handled in a tick.
    pub max_fetch_messages_from_db: u64,
    /// The time a claim transaction is given to produce a receipt.
    pub message_submission_timeout: Duration,
    /// The additional time an unmined claim is given after the timeout before it is dropped.
    pub drop_grace_period: Duration,
    /// The delay before a failed claim is retried.
    pub retry_delay: Duration,
    /// The number of failed claims after which a message is abandoned.
    pub max_retries: u32,
    /// The interval between two re-evaluations of the economic exclusions.
    pub exclusion_resweep_interval: Duration,
}
