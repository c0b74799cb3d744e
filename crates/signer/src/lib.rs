//! A library responsible for signing and broadcasting claim transactions for the Postman.
//!
//! The [`NonceManager`] is the single owner of the nonce sequence of a signing key. Broadcast
//! requests are sent through a [`NonceManagerHandle`] and processed strictly one at a time, so two
//! claims can never be assigned the same nonce. The next nonce is resynchronized from the chain on
//! first use and after every broadcast whose outcome is unknown.

use std::{sync::Arc, time::Instant};

use alloy_primitives::B256;
use futures::stream::StreamExt;
use postman_db::DatabaseOperations;
use postman_primitives::{ClaimTransaction, Direction};
use postman_providers::{ProviderError, TransactionSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

mod error;
pub use error::SignerError;

mod handle;
pub use handle::NonceManagerHandle;

mod metrics;
pub use metrics::NonceManagerMetrics;

mod requests;
pub use requests::NonceManagerRequest;

/// A claim transaction accepted by the node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BroadcastedClaim {
    /// The transaction hash.
    pub hash: B256,
    /// The nonce the transaction was signed with.
    pub nonce: u64,
}

/// The configuration of the [`NonceManager`].
#[derive(Debug, Clone, Copy)]
pub struct NonceManagerConfig {
    /// The direction of the claims, used to look up the last persisted nonce.
    pub direction: Direction,
    /// The maximum distance the persisted nonce may be ahead of the chain nonce.
    pub max_nonce_diff: u64,
}

/// The nonce manager owns the nonce of a signing key and broadcasts claim transactions.
#[derive(Debug)]
pub struct NonceManager<S, DB> {
    /// The transaction sender for the signing key.
    sender: S,
    /// The database holding the persisted claim nonces.
    database: Arc<DB>,
    /// The configuration.
    config: NonceManagerConfig,
    /// The next nonce to use, if known.
    next_nonce: Option<u64>,
    /// A stream of pending broadcast requests.
    requests: UnboundedReceiverStream<NonceManagerRequest>,
    /// The nonce manager metrics.
    metrics: NonceManagerMetrics,
}

impl<S, DB> NonceManager<S, DB>
where
    S: TransactionSender + 'static,
    DB: DatabaseOperations + Send + Sync + 'static,
{
    /// Creates a new [`NonceManager`] instance and [`NonceManagerHandle`].
    fn new(sender: S, database: Arc<DB>, config: NonceManagerConfig) -> (Self, NonceManagerHandle) {
        let (req_tx, req_rx) = tokio::sync::mpsc::unbounded_channel();
        let address = sender.address();
        let manager = Self {
            sender,
            database,
            config,
            next_nonce: None,
            requests: req_rx.into(),
            metrics: NonceManagerMetrics::default(),
        };
        (manager, NonceManagerHandle::new(req_tx, address))
    }

    /// Spawns a new [`NonceManager`] instance onto the tokio runtime.
    pub fn spawn(sender: S, database: Arc<DB>, config: NonceManagerConfig) -> NonceManagerHandle {
        let (manager, handle) = Self::new(sender, database, config);
        tokio::spawn(manager.run());
        handle
    }

    /// Execution loop for the nonce manager.
    async fn run(mut self) {
        while let Some(request) = self.requests.next().await {
            match request {
                NonceManagerRequest::Broadcast { transaction, reply } => {
                    let now = Instant::now();
                    let result = self.broadcast(transaction).await;
                    self.metrics.broadcast_duration.record(now.elapsed().as_secs_f64());
                    match &result {
                        Ok(_) => self.metrics.broadcasts.increment(1),
                        Err(err) => {
                            self.metrics.broadcast_failures.increment(1);
                            tracing::debug!(target: "postman::signer", %err, "Broadcast failed.");
                        }
                    }
                    if reply.send(result).is_err() {
                        tracing::debug!(target: "postman::signer", "Broadcast requester dropped before the reply.");
                    }
                }
            }
        }

        tracing::info!(target: "postman::signer", "Nonce manager request channel has been closed - shutting down.");
    }

    /// Signs and broadcasts the transaction on the next nonce, or on the nonce it replaces.
    #[tracing::instrument(target = "postman::signer", skip_all, fields(to = %transaction.to, replace_nonce = ?transaction.replace_nonce))]
    async fn broadcast(
        &mut self,
        transaction: ClaimTransaction,
    ) -> Result<BroadcastedClaim, SignerError> {
        if let Some(nonce) = transaction.replace_nonce {
            return self.send(&transaction, nonce).await;
        }

        let nonce = match self.next_nonce {
            Some(nonce) => nonce,
            None => self.resync().await?,
        };
        match self.send(&transaction, nonce).await {
            Err(SignerError::Provider(ProviderError::Nonce(reason))) => {
                tracing::warn!(target: "postman::signer", nonce, %reason, "Nonce refused by the node, resyncing.");
                let nonce = self.resync().await?;
                self.send(&transaction, nonce).await
            }
            result => result,
        }
    }

    /// Broadcasts on the provided nonce and updates the next nonce from the outcome.
    async fn send(
        &mut self,
        transaction: &ClaimTransaction,
        nonce: u64,
    ) -> Result<BroadcastedClaim, SignerError> {
        match self.sender.sign_and_broadcast(transaction, nonce).await {
            Ok(hash) => {
                tracing::debug!(target: "postman::signer", ?hash, nonce, "Broadcast claim transaction.");
                if transaction.replace_nonce.is_none() {
                    self.next_nonce = Some(nonce + 1);
                }
                Ok(BroadcastedClaim { hash, nonce })
            }
            Err(err) if err.is_definitive_rejection() => Err(err.into()),
            Err(source) => {
                // the transaction may have reached the mempool.
                self.next_nonce = None;
                Err(SignerError::Unconfirmed { nonce, source })
            }
        }
    }

    /// Resynchronizes the next nonce from the chain and the persisted claims.
    async fn resync(&mut self) -> Result<u64, SignerError> {
        self.metrics.nonce_resyncs.increment(1);
        self.next_nonce = None;

        let chain = self.sender.pending_nonce().await.map_err(SignerError::Resync)?;
        let persisted = self.database.get_last_claim_tx_nonce(self.config.direction).await?;

        let nonce = match persisted {
            Some(persisted) if persisted.saturating_sub(chain) > self.config.max_nonce_diff => {
                return Err(SignerError::NonceDrift {
                    chain,
                    persisted,
                    max_diff: self.config.max_nonce_diff,
                });
            }
            Some(persisted) => chain.max(persisted + 1),
            None => chain,
        };

        tracing::info!(target: "postman::signer", chain, ?persisted, nonce, "Resynced nonce.");
        self.next_nonce = Some(nonce);
        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};
    use postman_db::{
        test_utils::setup_test_db, ClaimTransactionDetails, Database, MessageTransition,
    };
    use postman_primitives::{GasFees, Message, MessageSentEvent, MessageStatus};
    use postman_providers::test_utils::MockChain;

    const CONFIG: NonceManagerConfig =
        NonceManagerConfig { direction: Direction::L1ToL2, max_nonce_diff: 10 };

    fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn claim(input: u8) -> ClaimTransaction {
        ClaimTransaction {
            to: Address::repeat_byte(1),
            input: Bytes::from(vec![input]),
            gas_limit: 100_000,
            fees: GasFees::new(10, 1),
            replace_nonce: None,
        }
    }

    async fn persist_claim_nonce(db: &Database, nonce: u64) -> eyre::Result<()> {
        let event = MessageSentEvent {
            message_hash: B256::repeat_byte(nonce as u8),
            sender: Address::ZERO,
            recipient: Address::ZERO,
            fee: Default::default(),
            value: Default::default(),
            nonce: Default::default(),
            calldata: Bytes::new(),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        let message = Message::from_event(event, CONFIG.direction, MessageStatus::Sent, None, 0);
        let hash = message.message_hash;
        db.insert_message(message).await?;
        for (from, transition) in [
            (MessageStatus::Sent, MessageTransition::to(MessageStatus::Anchored)),
            (MessageStatus::Anchored, MessageTransition::ready(100_000, 100, 1)),
            (MessageStatus::Ready, MessageTransition::claiming(1)),
        ] {
            db.transition_message(hash, from, transition).await?;
        }
        let details = ClaimTransactionDetails {
            hash: Some(B256::repeat_byte(0xee)),
            nonce,
            gas_limit: 100_000,
            fees: GasFees::new(10, 1),
            broadcasted_at: 1,
        };
        db.record_claim_transaction(hash, details).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_broadcasts_use_sequential_nonces() -> eyre::Result<()> {
        init_test_tracing();
        let chain = MockChain::new();
        chain.state().pending_nonce = 5;
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain.clone(), db, CONFIG);

        let first = handle.broadcast(claim(1)).await?;
        let second = handle.broadcast(claim(2)).await?;

        assert_eq!((first.nonce, second.nonce), (5, 6));
        assert_eq!(chain.broadcast_hashes(), vec![first.hash, second.hash]);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_distinct_nonces() -> eyre::Result<()> {
        let chain = MockChain::new();
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain, db, CONFIG);

        let requests = (0..10u8).map(|i| {
            let handle = handle.clone();
            async move { handle.broadcast(claim(i)).await }
        });
        let mut nonces = futures::future::try_join_all(requests)
            .await?
            .into_iter()
            .map(|claim| claim.nonce)
            .collect::<Vec<_>>();
        nonces.sort_unstable();

        assert_eq!(nonces, (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_resync_skips_persisted_nonces() -> eyre::Result<()> {
        let chain = MockChain::new();
        chain.state().pending_nonce = 6;
        let db = setup_test_db().await;
        persist_claim_nonce(&db, 7).await?;
        let handle = NonceManager::spawn(chain, Arc::new(db), CONFIG);

        let broadcast = handle.broadcast(claim(1)).await?;

        assert_eq!(broadcast.nonce, 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_nonce_drift_is_fatal() -> eyre::Result<()> {
        let chain = MockChain::new();
        chain.state().pending_nonce = 5;
        let db = setup_test_db().await;
        persist_claim_nonce(&db, 20).await?;
        let handle = NonceManager::spawn(chain.clone(), Arc::new(db), CONFIG);

        let err = handle.broadcast(claim(1)).await.unwrap_err();

        assert!(matches!(err, SignerError::NonceDrift { chain: 5, persisted: 20, max_diff: 10 }));
        assert!(err.is_fatal());
        assert!(err.is_definitive_rejection());
        assert!(chain.broadcast_hashes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_nonce_error_resyncs_and_retries_once() -> eyre::Result<()> {
        let chain = MockChain::new();
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain.clone(), db, CONFIG);
        assert_eq!(handle.broadcast(claim(1)).await?.nonce, 0);

        // Another sender consumed nonces of the key behind the manager's back.
        {
            let mut state = chain.state();
            state.confirmed_nonce = 4;
            state.pending_nonce = 4;
        }

        let broadcast = handle.broadcast(claim(2)).await?;
        assert_eq!(broadcast.nonce, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_nonce_error_is_a_rejection() -> eyre::Result<()> {
        let chain = MockChain::new();
        chain
            .state()
            .broadcast_errors
            .extend([ProviderError::Nonce("low".into()), ProviderError::Nonce("low".into())]);
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain, db, CONFIG);

        let err = handle.broadcast(claim(1)).await.unwrap_err();

        assert!(matches!(err, SignerError::Provider(ProviderError::Nonce(_))));
        assert!(err.is_definitive_rejection());
        Ok(())
    }

    #[tokio::test]
    async fn test_ambiguous_outcome_forces_resync() -> eyre::Result<()> {
        let chain = MockChain::new();
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain.clone(), db, CONFIG);
        assert_eq!(handle.broadcast(claim(1)).await?.nonce, 0);

        chain
            .state()
            .broadcast_errors
            .push_back(ProviderError::Timeout(std::time::Duration::from_secs(1)));
        let err = handle.broadcast(claim(2)).await.unwrap_err();
        assert!(!err.is_definitive_rejection());
        assert_eq!(err.unconfirmed_nonce(), Some(1));

        // The timed out transaction reached the mempool after all.
        chain.state().pending_nonce = 2;
        assert_eq!(handle.broadcast(claim(3)).await?.nonce, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_nonce_signs_nothing() -> eyre::Result<()> {
        let chain = MockChain::new();
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain.clone(), db, CONFIG);

        chain.state().nonce_errors.push_back(ProviderError::RateLimited);
        let err = handle.broadcast(claim(1)).await.unwrap_err();
        assert!(matches!(err, SignerError::Resync(ProviderError::RateLimited)));
        assert!(err.is_definitive_rejection());
        assert_eq!(err.unconfirmed_nonce(), None);
        assert!(chain.broadcast_hashes().is_empty());

        assert_eq!(handle.broadcast(claim(2)).await?.nonce, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replacement_keeps_the_sequence() -> eyre::Result<()> {
        let chain = MockChain::new();
        let db = Arc::new(setup_test_db().await);
        let handle = NonceManager::spawn(chain, db, CONFIG);
        assert_eq!(handle.broadcast(claim(1)).await?.nonce, 0);
        assert_eq!(handle.broadcast(claim(2)).await?.nonce, 1);

        let replacement = ClaimTransaction {
            fees: GasFees::new(11, 2),
            replace_nonce: Some(0),
            ..claim(1)
        };
        assert_eq!(handle.broadcast(replacement).await?.nonce, 0);
        assert_eq!(handle.broadcast(claim(3)).await?.nonce, 2);
        Ok(())
    }

    // The following tests ensure that the shutdown logic works correctly and does not panic.

    #[tokio::test]
    async fn test_drop_nonce_manager_handle() {
        init_test_tracing();
        let db = Arc::new(setup_test_db().await);
        let (manager, handle) = NonceManager::new(MockChain::new(), db, CONFIG);

        // Spawn the manager task and capture the JoinHandle
        let task = tokio::spawn(manager.run());

        // Drop the handle to simulate shutdown
        drop(handle);

        // Wait for the manager task to complete
        task.await.expect("nonce manager task panicked");
    }

    #[tokio::test]
    async fn test_drop_nonce_manager_handle_with_request() {
        init_test_tracing();
        let db = Arc::new(setup_test_db().await);
        let (manager, handle) = NonceManager::new(MockChain::new(), db, CONFIG);
        let task = tokio::spawn(manager.run());

        // Send a request and drop the handle before the reply is awaited.
        let request = handle.clone();
        let pending = tokio::spawn(async move { request.broadcast(claim(1)).await });
        drop(handle);

        assert!(pending.await.expect("request task panicked").is_ok());
        task.await.expect("nonce manager task panicked");
    }

    #[tokio::test]
    async fn test_closed_manager_rejects_requests() {
        let db = Arc::new(setup_test_db().await);
        let (manager, handle) = NonceManager::new(MockChain::new(), db, CONFIG);
        drop(manager);

        let err = handle.broadcast(claim(1)).await.unwrap_err();
        assert!(matches!(err, SignerError::RequestChannelClosed));
    }
}
