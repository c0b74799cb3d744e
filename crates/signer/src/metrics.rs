use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::NonceManager`].
#[derive(Metrics, Clone)]
#[metrics(scope = "postman_signer")]
pub struct NonceManagerMetrics {
    /// The number of transactions broadcast.
    pub broadcasts: Counter,
    /// The number of failed broadcasts.
    pub broadcast_failures: Counter,
    /// The number of nonce resynchronizations with the chain.
    pub nonce_resyncs: Counter,
    /// The broadcast duration.
    pub broadcast_duration: Histogram,
}
