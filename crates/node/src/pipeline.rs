//! The components of a relayed direction, wired together over a shared message store.

use crate::poller::{Poller, PollerConfig, PollerExit};
use std::sync::Arc;

use postman_claimer::{
    ClaimPayloadBuilder, ClaimPayloadConfig, ClaimSubmitter, GasFeeConfig, GasFeeEstimator,
    GateConfig, Reconciler, ReconcilerConfig, SubmitterConfig, ValidationGate,
};
use postman_db::Database;
use postman_indexer::{
    AnchoringTracker, AnchoringTrackerConfig, MessageSentIndexer, MessageSentIndexerConfig,
};
use postman_providers::{
    ChainLogSource, FeeHistorySource, MessageServiceClient, TransactionSender,
};
use postman_signer::{NonceManager, NonceManagerConfig};
use tokio::{sync::watch, task::JoinSet};

/// The configuration of every component of a direction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The message indexer configuration.
    pub indexer: MessageSentIndexerConfig,
    /// The anchoring tracker configuration.
    pub anchoring: AnchoringTrackerConfig,
    /// The fee estimation configuration.
    pub fees: GasFeeConfig,
    /// The claim payload configuration.
    pub payload: ClaimPayloadConfig,
    /// The validation gate configuration.
    pub gate: GateConfig,
    /// The claim submitter configuration.
    pub submitter: SubmitterConfig,
    /// The reconciler configuration.
    pub reconciler: ReconcilerConfig,
    /// The nonce manager configuration.
    pub nonce_manager: NonceManagerConfig,
    /// The scheduling of the indexing loops.
    pub listener_poller: PollerConfig,
    /// The scheduling of the claiming loops.
    pub claiming_poller: PollerConfig,
}

/// The chain collaborators of a direction.
#[derive(Debug, Clone)]
pub struct PipelineChains<S, D, C, T> {
    /// The chain the messages are sent on.
    pub source: S,
    /// The chain the messages are claimed on.
    pub destination: D,
    /// The destination message service.
    pub client: C,
    /// The sender of the claim transactions.
    pub sender: T,
}

/// The five loops of a direction.
#[derive(Debug)]
pub struct Pipeline<S, D, C, T> {
    /// Indexes the messages sent on the source chain.
    pub indexer: MessageSentIndexer<S>,
    /// Promotes the anchored messages.
    pub anchoring: AnchoringTracker<D>,
    /// Decides which anchored messages are claimed.
    pub gate: ValidationGate<C, D>,
    /// Broadcasts the claims of the ready messages.
    pub submitter: ClaimSubmitter<C, D, T>,
    /// Converges the claims with the destination chain.
    pub reconciler: Reconciler<C, T>,
}

impl<S, D, C, T> Pipeline<S, D, C, T>
where
    S: ChainLogSource + 'static,
    D: ChainLogSource + FeeHistorySource + Clone + 'static,
    C: MessageServiceClient + Clone + 'static,
    T: TransactionSender + Clone + 'static,
{
    /// Builds the components of the direction and spawns the nonce manager of the signing key.
    pub fn new(
        chains: PipelineChains<S, D, C, T>,
        database: Arc<Database>,
        config: &PipelineConfig,
    ) -> Self {
        let PipelineChains { source, destination, client, sender } = chains;
        let signer =
            NonceManager::spawn(sender.clone(), database.clone(), config.nonce_manager);
        let payload = ClaimPayloadBuilder::new(config.payload);

        let indexer = MessageSentIndexer::new(source, database.clone(), config.indexer);
        let anchoring =
            AnchoringTracker::new(destination.clone(), database.clone(), config.anchoring);
        let gate = ValidationGate::new(
            client.clone(),
            GasFeeEstimator::new(destination.clone(), config.fees),
            payload,
            sender.address(),
            database.clone(),
            config.gate.clone(),
        );
        let submitter = ClaimSubmitter::new(
            client.clone(),
            GasFeeEstimator::new(destination, config.fees),
            sender.clone(),
            signer,
            payload,
            database.clone(),
            config.submitter,
        );
        let reconciler = Reconciler::new(client, sender, database, config.reconciler);

        Self { indexer, anchoring, gate, submitter, reconciler }
    }

    /// Spawns one poller per component. The pollers stop when `shutdown` turns true.
    pub fn spawn(
        self,
        config: &PipelineConfig,
        shutdown: watch::Receiver<bool>,
    ) -> JoinSet<PollerExit> {
        let listener = config.listener_poller;
        let claiming = config.claiming_poller;

        let mut pollers = JoinSet::new();
        pollers.spawn(Poller::new(self.indexer, listener, shutdown.clone()).run());
        pollers.spawn(Poller::new(self.anchoring, listener, shutdown.clone()).run());
        pollers.spawn(Poller::new(self.gate, claiming, shutdown.clone()).run());
        pollers.spawn(Poller::new(self.submitter, claiming, shutdown.clone()).run());
        pollers.spawn(Poller::new(self.reconciler, claiming, shutdown).run());
        pollers
    }
}
