//! The claim submitter broadcasts the claims of ready messages.

use crate::{
    metrics::{ClaimerTask, TaskMetrics},
    ClaimPayloadBuilder, ClaimerError, EconomicsRecorder, GasFeeEstimator, SubmitterConfig,
};

use alloy_primitives::B256;
use postman_db::{ClaimTransactionDetails, Database, DatabaseOperations, MessageTransition};
use postman_primitives::{
    unix_timestamp, ClaimTransaction, GasFees, Message, MessageStatus, OnChainMessageStatus,
};
use postman_providers::{ChainLogSource, FeeHistorySource, MessageServiceClient, TransactionSender};
use postman_signer::{NonceManagerHandle, SignerError};
use std::{sync::Arc, time::Instant};

/// The outcome of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The claim was broadcast.
    Broadcast,
    /// The message was found claimed on the destination chain.
    ClaimedExternal,
    /// The message cannot be claimed yet.
    Deferred,
    /// Another writer moved the message first.
    RaceLost,
    /// The node refused the claim, the message is `READY` again.
    Rejected,
    /// The outcome of the broadcast is unknown, the message is left `CLAIMING`.
    Ambiguous,
}

/// A message prepared for a claim.
#[derive(Debug)]
enum Prepared {
    /// The claim transaction to broadcast.
    Claim(ClaimTransaction),
    /// The message has already been claimed on the destination chain.
    ClaimedExternal,
    /// The destination does not know the message.
    Unknown,
}

/// The summary of a tick of the [`ClaimSubmitter`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterSummary {
    /// Claims broadcast.
    pub broadcast: usize,
    /// Messages found claimed on the destination chain.
    pub claimed_external: usize,
    /// Messages skipped until the next tick.
    pub skipped: usize,
    /// Claims refused by the node.
    pub rejected: usize,
    /// Broadcasts with an unknown outcome.
    pub ambiguous: usize,
}

impl SubmitterSummary {
    fn add(&mut self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Broadcast => self.broadcast += 1,
            SubmissionOutcome::ClaimedExternal => self.claimed_external += 1,
            SubmissionOutcome::Deferred | SubmissionOutcome::RaceLost => self.skipped += 1,
            SubmissionOutcome::Rejected => self.rejected += 1,
            SubmissionOutcome::Ambiguous => self.ambiguous += 1,
        }
    }
}

/// Claims the most profitable ready messages.
#[derive(Debug)]
pub struct ClaimSubmitter<C, F, S> {
    /// The destination message service.
    client: C,
    /// The destination fee estimator.
    fees: GasFeeEstimator<F>,
    /// The transaction sender, used to check whether a previous claim is still pending.
    sender: S,
    /// The handle to the nonce manager of the signing key.
    signer: NonceManagerHandle,
    /// The claim payload builder.
    payload: ClaimPayloadBuilder,
    /// A reference to the database.
    database: Arc<Database>,
    /// The submitter configuration.
    config: SubmitterConfig,
    /// The economics recorder.
    recorder: EconomicsRecorder,
    /// The tick metrics.
    metrics: TaskMetrics,
}

impl<C, F, S> ClaimSubmitter<C, F, S>
where
    C: MessageServiceClient,
    F: ChainLogSource + FeeHistorySource,
    S: TransactionSender,
{
    /// Returns a new [`ClaimSubmitter`].
    pub fn new(
        client: C,
        fees: GasFeeEstimator<F>,
        sender: S,
        signer: NonceManagerHandle,
        payload: ClaimPayloadBuilder,
        database: Arc<Database>,
        config: SubmitterConfig,
    ) -> Self {
        let recorder = EconomicsRecorder::new(config.direction);
        let metrics = TaskMetrics::for_task(ClaimerTask::Submitter, config.direction);
        Self { client, fees, sender, signer, payload, database, config, recorder, metrics }
    }

    /// Claims the next batch of ready messages.
    #[tracing::instrument(target = "postman::claimer", skip_all, fields(direction = %self.config.direction))]
    pub async fn tick(&mut self) -> Result<SubmitterSummary, ClaimerError> {
        let now = Instant::now();
        let result = self.submit_ready().await;
        self.metrics.task_duration.record(now.elapsed().as_secs_f64());
        result
    }

    async fn submit_ready(&mut self) -> Result<SubmitterSummary, ClaimerError> {
        let mut summary = SubmitterSummary::default();
        let messages = self
            .database
            .get_ready_messages(self.config.direction, self.config.max_claims_per_tick)
            .await?;
        if messages.is_empty() {
            return Ok(summary);
        }

        let fees = self.fees.estimate().await?;
        let mut confirmed_nonce = None;
        for message in messages {
            let outcome = self.submit(&message, fees, &mut confirmed_nonce).await?;
            summary.add(outcome);
        }

        Ok(summary)
    }

    /// Claims a ready message. Provider failures before the broadcast defer the message, the
    /// returned errors are the store failures and the fatal signer failures.
    async fn submit(
        &self,
        message: &Message,
        fees: GasFees,
        confirmed_nonce: &mut Option<u64>,
    ) -> Result<SubmissionOutcome, ClaimerError> {
        let hash = message.message_hash;
        let prepared = match self.prepare(message, fees, confirmed_nonce).await {
            Ok(prepared) => prepared,
            Err(ClaimerError::Provider(err)) => {
                tracing::warn!(target: "postman::claimer", ?hash, %err, "Claim deferred.");
                return Ok(SubmissionOutcome::Deferred);
            }
            Err(err) => return Err(err),
        };
        let transaction = match prepared {
            Prepared::Claim(transaction) => transaction,
            Prepared::Unknown => {
                tracing::warn!(target: "postman::claimer", ?hash, "Ready message unknown to the destination.");
                return Ok(SubmissionOutcome::Deferred);
            }
            Prepared::ClaimedExternal => {
                let outcome = self
                    .database
                    .transition_message(
                        hash,
                        MessageStatus::Ready,
                        MessageTransition::to(MessageStatus::ClaimedExternal),
                    )
                    .await?;
                if !outcome.is_applied() {
                    return Ok(SubmissionOutcome::RaceLost);
                }
                tracing::info!(target: "postman::claimer", ?hash, "Message already claimed.");
                self.recorder.record_claimed_external();
                return Ok(SubmissionOutcome::ClaimedExternal);
            }
        };

        // the claiming status is the lock that guarantees at most one broadcast
        let started_at = unix_timestamp();
        let outcome = self
            .database
            .transition_message(
                hash,
                MessageStatus::Ready,
                MessageTransition::claiming(started_at),
            )
            .await?;
        if !outcome.is_applied() {
            tracing::debug!(target: "postman::claimer", ?hash, "Message claimed concurrently.");
            return Ok(SubmissionOutcome::RaceLost);
        }

        let gas_limit = transaction.gas_limit;
        let fees = transaction.fees;
        match self.signer.broadcast(transaction).await {
            Ok(claim) => {
                let details = ClaimTransactionDetails {
                    hash: Some(claim.hash),
                    nonce: claim.nonce,
                    gas_limit,
                    fees,
                    broadcasted_at: started_at,
                };
                self.database.record_claim_transaction(hash, details).await?;
                self.recorder.record_broadcast();
                tracing::info!(target: "postman::claimer", ?hash, transaction_hash = ?claim.hash, nonce = claim.nonce, "Claim transaction broadcast.");
                Ok(SubmissionOutcome::Broadcast)
            }
            Err(err @ SignerError::Resync(_)) => {
                tracing::warn!(target: "postman::claimer", ?hash, %err, "Claim deferred.");
                self.release(hash).await?;
                Ok(SubmissionOutcome::Deferred)
            }
            Err(err) if err.is_definitive_rejection() => {
                tracing::error!(target: "postman::claimer", ?hash, %err, "Claim transaction rejected.");
                self.recorder.record_rejected_broadcast();
                self.release(hash).await?;
                if err.is_fatal() {
                    return Err(err.into());
                }
                Ok(SubmissionOutcome::Rejected)
            }
            Err(err) => {
                tracing::warn!(target: "postman::claimer", ?hash, %err, "Claim broadcast outcome unknown, leaving it to reconciliation.");
                if let Some(nonce) = err.unconfirmed_nonce() {
                    // a retry replaces the transaction on the same nonce
                    let details = ClaimTransactionDetails {
                        hash: None,
                        nonce,
                        gas_limit,
                        fees,
                        broadcasted_at: started_at,
                    };
                    self.database.record_claim_transaction(hash, details).await?;
                }
                Ok(SubmissionOutcome::Ambiguous)
            }
        }
    }

    /// Returns a claiming message whose claim was not sent to `READY`.
    async fn release(&self, hash: B256) -> Result<(), ClaimerError> {
        self.database
            .transition_message(
                hash,
                MessageStatus::Claiming,
                MessageTransition::to(MessageStatus::Ready),
            )
            .await?;
        Ok(())
    }

    /// Builds the claim transaction of the message after checking its on-chain status.
    async fn prepare(
        &self,
        message: &Message,
        fees: GasFees,
        confirmed_nonce: &mut Option<u64>,
    ) -> Result<Prepared, ClaimerError> {
        match self.client.claim_status(message).await? {
            OnChainMessageStatus::Claimed => return Ok(Prepared::ClaimedExternal),
            OnChainMessageStatus::Unknown => return Ok(Prepared::Unknown),
            OnChainMessageStatus::Claimable => {}
        }

        let payload = self.payload.build(&self.client, message).await?;
        let gas_limit = match message.estimated_gas_limit {
            Some(gas_limit) => gas_limit,
            None => {
                self.client
                    .estimate_claim_gas(self.signer.address(), payload.to, payload.input.clone())
                    .await?
            }
        };

        // a previous attempt still holding its nonce is replaced with bumped fees
        let mut replace_nonce = None;
        let mut fees = fees;
        if let Some(previous_nonce) = message.claim_tx_nonce {
            let confirmed = match *confirmed_nonce {
                Some(nonce) => nonce,
                None => *confirmed_nonce.insert(self.sender.confirmed_nonce().await?),
            };
            if previous_nonce >= confirmed {
                let previous = GasFees::new(
                    message.claim_tx_max_fee_per_gas.unwrap_or_default(),
                    message.claim_tx_max_priority_fee_per_gas.unwrap_or_default(),
                );
                fees = previous
                    .bumped(self.config.price_bump_percent, self.fees.max_fee_per_gas_cap())
                    .max(&fees);
                replace_nonce = Some(previous_nonce);
                tracing::debug!(target: "postman::claimer", hash = ?message.message_hash, nonce = previous_nonce, ?fees, "Replacing pending claim transaction.");
            }
        }

        Ok(Prepared::Claim(payload.into_transaction(gas_limit, fees, replace_nonce)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClaimPayloadConfig, GasFeeConfig};
    use alloy_primitives::{Address, Bytes, U256};
    use postman_db::test_utils::setup_test_db;
    use postman_primitives::{ClaimFailure, Direction, MessageSentEvent};
    use postman_providers::{test_utils::MockChain, ProviderError};
    use postman_signer::{NonceManager, NonceManagerConfig};

    const DIRECTION: Direction = Direction::L1ToL2;
    const GWEI: u128 = 1_000_000_000;

    fn submitter(
        chain: &MockChain,
        db: Arc<Database>,
    ) -> ClaimSubmitter<MockChain, MockChain, MockChain> {
        let fees = GasFeeEstimator::new(
            chain.clone(),
            GasFeeConfig {
                block_count: 10,
                percentile: 15.0,
                max_fee_per_gas_cap: 100 * GWEI,
                enforce_max_gas_fee: false,
            },
        );
        let signer = NonceManager::spawn(
            chain.clone(),
            db.clone(),
            NonceManagerConfig { direction: DIRECTION, max_nonce_diff: 10 },
        );
        let payload = ClaimPayloadBuilder::new(ClaimPayloadConfig {
            fee_recipient: Address::ZERO,
            claim_via_address: None,
        });
        ClaimSubmitter::new(
            chain.clone(),
            fees,
            chain.clone(),
            signer,
            payload,
            db,
            SubmitterConfig {
                direction: DIRECTION,
                max_claims_per_tick: 10,
                price_bump_percent: 10,
            },
        )
    }

    async fn insert_ready(db: &Database, hash: u8, fee_per_gas: u64) -> eyre::Result<B256> {
        let event = MessageSentEvent {
            message_hash: B256::with_last_byte(hash),
            sender: Address::repeat_byte(2),
            recipient: Address::repeat_byte(3),
            fee: U256::from(fee_per_gas) * U256::from(100_000),
            value: U256::ZERO,
            nonce: U256::from(hash),
            calldata: Bytes::new(),
            block_number: 1,
            transaction_hash: B256::repeat_byte(4),
            log_index: 0,
        };
        let message = Message::from_event(event, DIRECTION, MessageStatus::Sent, None, 0);
        db.insert_message(message).await?;
        let hash = B256::with_last_byte(hash);
        db.transition_message(
            hash,
            MessageStatus::Sent,
            MessageTransition::to(MessageStatus::Anchored),
        )
        .await?;
        db.transition_message(
            hash,
            MessageStatus::Anchored,
            MessageTransition::ready(100_000, 100, fee_per_gas),
        )
        .await?;
        Ok(hash)
    }

    #[tokio::test]
    async fn test_broadcast_records_the_claim() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        let mut submitter = submitter(&chain, db.clone());

        let summary = submitter.tick().await?;

        assert_eq!(summary, SubmitterSummary { broadcast: 1, ..Default::default() });
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Claiming);
        assert_eq!(message.claim_tx_hash, chain.broadcast_hashes().first().copied());
        assert_eq!(message.claim_tx_nonce, Some(0));
        assert_eq!(message.claim_tx_gas_limit, Some(100_000));
        assert!(message.claim_tx_broadcasted_at.is_some());

        // the claiming message is not broadcast twice
        assert_eq!(submitter.tick().await?, SubmitterSummary::default());
        assert_eq!(chain.broadcast_hashes().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_most_profitable_first() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let cheap = insert_ready(&db, 1, 3 * GWEI as u64).await?;
        let rich = insert_ready(&db, 2, 9 * GWEI as u64).await?;
        let mut submitter = submitter(&chain, db.clone());

        submitter.tick().await?;

        let nonce = |hash| {
            let db = db.clone();
            async move { db.get_message(hash).await.map(|m| m.and_then(|m| m.claim_tx_nonce)) }
        };
        assert_eq!(nonce(rich).await?, Some(0));
        assert_eq!(nonce(cheap).await?, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_claimed_on_chain_is_not_broadcast() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        chain.state().claim_statuses.insert(hash, OnChainMessageStatus::Claimed);
        let mut submitter = submitter(&chain, db.clone());

        let summary = submitter.tick().await?;

        assert_eq!(summary, SubmitterSummary { claimed_external: 1, ..Default::default() });
        assert!(chain.broadcast_hashes().is_empty());
        assert_eq!(
            db.get_message(hash).await?.map(|m| m.status),
            Some(MessageStatus::ClaimedExternal)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_broadcast_returns_to_ready() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        chain
            .state()
            .broadcast_errors
            .push_back(ProviderError::Rejected("insufficient funds".into()));
        let mut submitter = submitter(&chain, db.clone());

        let summary = submitter.tick().await?;

        assert_eq!(summary, SubmitterSummary { rejected: 1, ..Default::default() });
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::Ready));

        // the next tick claims it
        assert_eq!(submitter.tick().await?.broadcast, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ambiguous_broadcast_stays_claiming() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        chain
            .state()
            .broadcast_errors
            .push_back(ProviderError::Transport("connection reset".into()));
        let mut submitter = submitter(&chain, db.clone());

        let summary = submitter.tick().await?;

        assert_eq!(summary, SubmitterSummary { ambiguous: 1, ..Default::default() });
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Claiming);
        assert_eq!(message.claim_tx_hash, None);
        assert_eq!(message.claim_tx_nonce, Some(0));

        // once reconciled as dropped, the retry replaces the unknown transaction
        db.transition_message(
            hash,
            MessageStatus::Claiming,
            MessageTransition::claim_failed(ClaimFailure::Dropped),
        )
        .await?;
        db.transition_message(
            hash,
            MessageStatus::ClaimFailed,
            MessageTransition::to(MessageStatus::Ready),
        )
        .await?;
        assert_eq!(submitter.tick().await?.broadcast, 1);
        let (replacement, nonce, _) = chain.state().broadcasts[0].clone();
        assert_eq!(nonce, 0);
        assert_eq!(replacement.replace_nonce, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_nonce_defers_claim() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        chain
            .state()
            .nonce_errors
            .push_back(ProviderError::Timeout(std::time::Duration::from_secs(1)));
        let mut submitter = submitter(&chain, db.clone());

        let summary = submitter.tick().await?;

        assert_eq!(summary, SubmitterSummary { skipped: 1, ..Default::default() });
        assert!(chain.broadcast_hashes().is_empty());
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Ready);
        assert_eq!(message.retry_count, 0);
        assert_eq!(message.claim_tx_nonce, None);

        // the next tick claims it
        assert_eq!(submitter.tick().await?.broadcast, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_claim_is_replaced_with_bumped_fees() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        let mut submitter = submitter(&chain, db.clone());
        submitter.tick().await?;
        let first = chain.state().broadcasts[0].0.clone();

        // the transaction is dropped and the message fails back to ready
        chain.drop_transaction(chain.broadcast_hashes()[0]);
        db.transition_message(
            hash,
            MessageStatus::Claiming,
            MessageTransition::claim_failed(ClaimFailure::Dropped),
        )
        .await?;
        db.transition_message(
            hash,
            MessageStatus::ClaimFailed,
            MessageTransition::to(MessageStatus::Ready),
        )
        .await?;

        assert_eq!(submitter.tick().await?.broadcast, 1);
        let (replacement, nonce, _) = chain.state().broadcasts[1].clone();
        assert_eq!(nonce, 0);
        assert_eq!(replacement.replace_nonce, Some(0));
        assert_eq!(replacement.fees, first.fees.bumped(10, 100 * GWEI));
        Ok(())
    }

    #[tokio::test]
    async fn test_mined_claim_is_not_replaced() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_ready(&db, 1, 5 * GWEI as u64).await?;
        let mut submitter = submitter(&chain, db.clone());
        submitter.tick().await?;

        // the claim reverted on chain, its nonce is consumed
        chain.mine(chain.broadcast_hashes()[0], false, 50_000, GWEI);
        db.transition_message(
            hash,
            MessageStatus::Claiming,
            MessageTransition::claim_failed(ClaimFailure::Reverted),
        )
        .await?;
        db.transition_message(
            hash,
            MessageStatus::ClaimFailed,
            MessageTransition::to(MessageStatus::Ready),
        )
        .await?;

        submitter.tick().await?;
        let (retry, nonce, _) = chain.state().broadcasts[1].clone();
        assert_eq!(nonce, 1);
        assert_eq!(retry.replace_nonce, None);
        Ok(())
    }
}
