use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;
use postman_primitives::{ClaimFailure, Direction, ExclusionReason, MessageStatus};
use std::{collections::HashMap, hash::Hash};
use strum::IntoEnumIterator;

/// The outcomes of the claims of a direction.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_claimer")]
pub struct ClaimMetrics {
    /// The number of messages claimed by the Postman.
    pub claimed: Counter,
    /// The number of messages found claimed by someone else.
    pub claimed_external: Counter,
    /// The number of failed claims sent back to `READY`.
    pub retried: Counter,
    /// The number of messages abandoned after too many failed claims.
    pub terminal: Counter,
    /// The number of broadcast claim transactions.
    pub broadcasts: Counter,
    /// The number of broadcasts refused by the node.
    pub rejected_broadcasts: Counter,
    /// The gas spent by successful claims, in wei.
    pub gas_spent: Histogram,
    /// The part of the gas cost not covered by the message fee, in wei.
    pub sponsorship_fee: Histogram,
    /// The fee minus the gas cost of successful claims, in wei.
    pub fee_margin: Histogram,
    /// The time between the claim broadcast and its confirmation, in seconds.
    pub claim_latency: Histogram,
    /// The time between the message indexing and its claim confirmation, in seconds.
    pub delivery_latency: Histogram,
}

/// Counts the validation exclusions for one reason.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_claimer")]
pub struct ExclusionMetrics {
    /// The number of excluded messages.
    pub excluded: Counter,
}

/// Counts the failed claims for one cause.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_claimer")]
pub struct FailureMetrics {
    /// The number of failed claims.
    pub failed: Counter,
}

/// Tracks the number of messages in one status.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_claimer")]
pub struct BacklogMetrics {
    /// The number of messages in the status.
    pub backlog: Gauge,
}

/// Tracks the duration of the ticks of a loop.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_claimer")]
pub struct TaskMetrics {
    /// The duration of a tick.
    pub task_duration: Histogram,
}

/// An enum representing the claiming loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum ClaimerTask {
    /// The validation gate.
    Gate,
    /// The claim submitter.
    Submitter,
    /// The reconciliation loop.
    Reconciler,
}

impl ClaimerTask {
    /// Returns the str representation of the [`ClaimerTask`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gate => "gate",
            Self::Submitter => "submitter",
            Self::Reconciler => "reconciler",
        }
    }
}

impl TaskMetrics {
    /// Returns the metrics of the task for the provided direction.
    pub fn for_task(task: ClaimerTask, direction: Direction) -> Self {
        Self::new_with_labels(&[
            ("task", task.as_str().to_string()),
            ("direction", direction.to_string()),
        ])
    }
}

/// Builds one metrics instance per variant of `T`, labelled with `label`.
pub(crate) fn labelled<T, M>(
    label: &'static str,
    direction: Direction,
    new: impl Fn(&[(&'static str, String); 2]) -> M,
) -> HashMap<T, M>
where
    T: IntoEnumIterator + AsRef<str> + Eq + Hash,
{
    T::iter()
        .map(|variant| {
            let labels =
                [(label, variant.as_ref().to_string()), ("direction", direction.to_string())];
            let metrics = new(&labels);
            (variant, metrics)
        })
        .collect()
}

/// Returns the exclusion metrics per reason.
pub(crate) fn exclusion_metrics(
    direction: Direction,
) -> HashMap<ExclusionReason, ExclusionMetrics> {
    labelled("reason", direction, |labels| ExclusionMetrics::new_with_labels(labels))
}

/// Returns the failure metrics per cause.
pub(crate) fn failure_metrics(direction: Direction) -> HashMap<ClaimFailure, FailureMetrics> {
    labelled("cause", direction, |labels| FailureMetrics::new_with_labels(labels))
}

/// Returns the backlog metrics per status.
pub(crate) fn backlog_metrics(direction: Direction) -> HashMap<MessageStatus, BacklogMetrics> {
    labelled("status", direction, |labels| BacklogMetrics::new_with_labels(labels))
}
