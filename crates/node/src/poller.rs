//! The polling loop driving every component of the pipeline.

use std::{fmt::Debug, time::Duration};

use postman_claimer::{
    ClaimSubmitter, ClaimerError, Reconciler, ValidationGate,
};
use postman_indexer::{AnchoringTracker, IndexerError, MessageSentIndexer};
use postman_providers::{
    ChainLogSource, FeeHistorySource, MessageServiceClient, TransactionSender,
};
use tokio::sync::watch;

/// A component ticked by a [`Poller`].
#[async_trait::async_trait]
pub trait PollingTask: Send {
    /// The outcome of a successful tick.
    type Summary: Debug + Send;
    /// The error of a failed tick.
    type Error: std::error::Error + Send;

    /// The name of the task, used in logs.
    fn name(&self) -> &'static str;

    /// Runs a single tick of the task.
    async fn tick(&mut self) -> Result<Self::Summary, Self::Error>;

    /// Returns true if the error stops the task.
    fn is_fatal(error: &Self::Error) -> bool;
}

/// The scheduling configuration of a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// The delay between two successful ticks.
    pub interval: Duration,
    /// The maximum delay after consecutive failed ticks.
    pub max_backoff: Duration,
}

impl PollerConfig {
    /// Returns the delay before the next tick after `failures` consecutive failed ticks.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let factor = 1u32.checked_shl(failures.min(31)).unwrap_or(u32::MAX);
        self.interval.saturating_mul(factor).min(self.max_backoff.max(self.interval))
    }
}

/// The reason a [`Poller`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// The shutdown signal was received.
    Shutdown,
    /// The task returned a fatal error.
    Fatal,
}

/// Ticks a task on its interval until shutdown or a fatal error.
#[derive(Debug)]
pub struct Poller<T> {
    task: T,
    config: PollerConfig,
    shutdown: watch::Receiver<bool>,
}

impl<T: PollingTask> Poller<T> {
    /// Returns a new [`Poller`].
    pub const fn new(task: T, config: PollerConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self { task, config, shutdown }
    }

    /// Runs the polling loop.
    ///
    /// A failed tick is retried with an exponential backoff capped at `max_backoff`. A fatal error
    /// stops the loop, the other loops of the daemon keep running.
    pub async fn run(mut self) -> PollerExit {
        let name = self.task.name();
        tracing::info!(target: "postman::node", task = name, "Starting poller.");

        let mut failures = 0u32;
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            match self.task.tick().await {
                Ok(summary) => {
                    failures = 0;
                    tracing::debug!(target: "postman::node", task = name, ?summary, "Tick completed.");
                }
                Err(err) if T::is_fatal(&err) => {
                    tracing::error!(target: "postman::node", task = name, %err, "Fatal error, stopping poller.");
                    return PollerExit::Fatal;
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(target: "postman::node", task = name, failures, %err, "Tick failed.");
                }
            }

            let delay = self.config.delay(failures);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => {}
            }
        }

        tracing::info!(target: "postman::node", task = name, "Poller shut down.");
        PollerExit::Shutdown
    }
}

#[async_trait::async_trait]
impl<S: ChainLogSource> PollingTask for MessageSentIndexer<S> {
    type Summary = postman_indexer::IndexerEvent;
    type Error = IndexerError;

    fn name(&self) -> &'static str {
        "message-sent-indexer"
    }

    async fn tick(&mut self) -> Result<Self::Summary, Self::Error> {
        Self::tick(self).await
    }

    fn is_fatal(error: &Self::Error) -> bool {
        error.is_fatal()
    }
}

#[async_trait::async_trait]
impl<D: ChainLogSource> PollingTask for AnchoringTracker<D> {
    type Summary = postman_indexer::IndexerEvent;
    type Error = IndexerError;

    fn name(&self) -> &'static str {
        "anchoring-tracker"
    }

    async fn tick(&mut self) -> Result<Self::Summary, Self::Error> {
        Self::tick(self).await
    }

    fn is_fatal(error: &Self::Error) -> bool {
        error.is_fatal()
    }
}

#[async_trait::async_trait]
impl<C, F> PollingTask for ValidationGate<C, F>
where
    C: MessageServiceClient,
    F: ChainLogSource + FeeHistorySource,
{
    type Summary = postman_claimer::GateSummary;
    type Error = ClaimerError;

    fn name(&self) -> &'static str {
        "validation-gate"
    }

    async fn tick(&mut self) -> Result<Self::Summary, Self::Error> {
        Self::tick(self).await
    }

    fn is_fatal(error: &Self::Error) -> bool {
        error.is_fatal()
    }
}

#[async_trait::async_trait]
impl<C, F, S> PollingTask for ClaimSubmitter<C, F, S>
where
    C: MessageServiceClient,
    F: ChainLogSource + FeeHistorySource,
    S: TransactionSender,
{
    type Summary = postman_claimer::SubmitterSummary;
    type Error = ClaimerError;

    fn name(&self) -> &'static str {
        "claim-submitter"
    }

    async fn tick(&mut self) -> Result<Self::Summary, Self::Error> {
        Self::tick(self).await
    }

    fn is_fatal(error: &Self::Error) -> bool {
        error.is_fatal()
    }
}

#[async_trait::async_trait]
impl<C, S> PollingTask for Reconciler<C, S>
where
    C: MessageServiceClient,
    S: TransactionSender,
{
    type Summary = postman_claimer::ReconcilerSummary;
    type Error = ClaimerError;

    fn name(&self) -> &'static str {
        "reconciler"
    }

    async fn tick(&mut self) -> Result<Self::Summary, Self::Error> {
        Self::tick(self).await
    }

    fn is_fatal(error: &Self::Error) -> bool {
        error.is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("tick failed, fatal: {0}")]
    struct TestError(bool);

    /// Fails `failures` times, then returns a fatal error.
    #[derive(Debug)]
    struct FailingTask {
        ticks: Arc<AtomicU32>,
        failures: u32,
    }

    #[async_trait::async_trait]
    impl PollingTask for FailingTask {
        type Summary = ();
        type Error = TestError;

        fn name(&self) -> &'static str {
            "failing"
        }

        async fn tick(&mut self) -> Result<(), TestError> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            Err(TestError(tick > self.failures))
        }

        fn is_fatal(error: &TestError) -> bool {
            error.0
        }
    }

    fn config() -> PollerConfig {
        PollerConfig { interval: Duration::from_millis(1), max_backoff: Duration::from_millis(4) }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config =
            PollerConfig { interval: Duration::from_secs(1), max_backoff: Duration::from_secs(10) };

        assert_eq!(config.delay(0), Duration::from_secs(1));
        assert_eq!(config.delay(1), Duration::from_secs(2));
        assert_eq!(config.delay(3), Duration::from_secs(8));
        assert_eq!(config.delay(4), Duration::from_secs(10));
        assert_eq!(config.delay(u32::MAX), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_fatal_error_stops_the_poller() {
        let ticks = Arc::new(AtomicU32::new(0));
        let task = FailingTask { ticks: ticks.clone(), failures: 3 };
        let (_tx, rx) = watch::channel(false);

        let exit = Poller::new(task, config(), rx).run().await;

        assert_eq!(exit, PollerExit::Fatal);
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_poller() {
        let ticks = Arc::new(AtomicU32::new(0));
        let task = FailingTask { ticks: ticks.clone(), failures: u32::MAX };
        let (tx, rx) = watch::channel(false);
        let config = PollerConfig {
            interval: Duration::from_secs(3600),
            max_backoff: Duration::from_secs(3600),
        };

        let poller = tokio::spawn(Poller::new(task, config, rx).run());
        while ticks.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        tx.send(true).expect("poller is running");

        assert_eq!(poller.await.expect("poller does not panic"), PollerExit::Shutdown);
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
