use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;
use strum::EnumIter;

/// An enum representing the items the indexer can handle.
#[derive(Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum IndexerItem {
    /// Message-sent events on the source chain.
    MessageSent,
    /// Anchoring events on the destination chain.
    Anchoring,
}

impl IndexerItem {
    /// Returns the str representation of the [`IndexerItem`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MessageSent => "message_sent",
            Self::Anchoring => "anchoring",
        }
    }
}

/// The metrics for an indexing loop.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_indexer")]
pub struct IndexerMetrics {
    /// The duration of the task for the indexer.
    pub task_duration: Histogram,
    /// The watermark of the indexed events.
    pub watermark: Gauge,
    /// The number of events stored.
    pub indexed: Counter,
}

/// The metrics for the message filters of the [`super::MessageSentIndexer`].
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_indexer")]
pub struct MessageFilterMetrics {
    /// The number of messages stored as excluded by the event filters.
    pub filtered: Counter,
}

/// The metrics for the [`super::AnchoringTracker`] promotions.
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_indexer")]
pub struct AnchoringMetrics {
    /// The number of messages moved to `ANCHORED`.
    pub anchored: Counter,
}
