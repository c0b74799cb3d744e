//! The reconciliation loop converges the persisted claims with the destination chain.

use crate::{
    metrics::{ClaimerTask, TaskMetrics},
    ClaimerError, EconomicsRecorder, ReconcilerConfig,
};

use postman_db::{Database, DatabaseOperations, MessageTransition};
use postman_primitives::{
    unix_timestamp, ClaimFailure, ClaimReceipt, Message, MessageStatus, OnChainMessageStatus,
};
use postman_providers::{MessageServiceClient, ProviderError, TransactionSender};
use std::{sync::Arc, time::Instant};

/// The summary of a tick of the [`Reconciler`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerSummary {
    /// Claims confirmed.
    pub claimed: usize,
    /// Ambiguous claims resolved as claimed by someone else.
    pub claimed_external: usize,
    /// Claims that reverted or were dropped.
    pub failed: usize,
    /// Failed claims sent back to `READY`.
    pub retried: usize,
    /// Messages abandoned after too many failed claims.
    pub terminal: usize,
    /// Economic exclusions sent back to `ANCHORED`.
    pub reswept: usize,
}

/// Resolves pending claims, retries failed ones and re-sweeps economic exclusions.
#[derive(Debug)]
pub struct Reconciler<C, S> {
    /// The destination message service.
    client: C,
    /// The transaction sender of the signing key.
    sender: S,
    /// A reference to the database.
    database: Arc<Database>,
    /// The reconciler configuration.
    config: ReconcilerConfig,
    /// The economics recorder.
    recorder: EconomicsRecorder,
    /// The tick metrics.
    metrics: TaskMetrics,
    /// The instant of the last re-sweep of the economic exclusions.
    last_resweep: Option<Instant>,
}

impl<C, S> Reconciler<C, S>
where
    C: MessageServiceClient,
    S: TransactionSender,
{
    /// Returns a new [`Reconciler`].
    pub fn new(client: C, sender: S, database: Arc<Database>, config: ReconcilerConfig) -> Self {
        let recorder = EconomicsRecorder::new(config.direction);
        let metrics = TaskMetrics::for_task(ClaimerTask::Reconciler, config.direction);
        Self { client, sender, database, config, recorder, metrics, last_resweep: None }
    }

    /// Runs a reconciliation pass.
    #[tracing::instrument(target = "postman::claimer", skip_all, fields(direction = %self.config.direction))]
    pub async fn tick(&mut self) -> Result<ReconcilerSummary, ClaimerError> {
        let now = Instant::now();
        let result = self.reconcile().await;
        self.metrics.task_duration.record(now.elapsed().as_secs_f64());
        result
    }

    async fn reconcile(&mut self) -> Result<ReconcilerSummary, ClaimerError> {
        let mut summary = ReconcilerSummary::default();
        self.resolve_claiming(&mut summary).await?;
        self.retry_failed(&mut summary).await?;

        let resweep_due = self
            .last_resweep
            .is_none_or(|last| last.elapsed() >= self.config.exclusion_resweep_interval);
        if resweep_due {
            self.resweep_exclusions(&mut summary).await?;
            self.last_resweep = Some(Instant::now());
        }

        let counts = self.database.count_messages_by_status(self.config.direction).await?;
        self.recorder.record_backlog(&counts);

        Ok(summary)
    }

    async fn resolve_claiming(&self, summary: &mut ReconcilerSummary) -> Result<(), ClaimerError> {
        let messages = self
            .database
            .get_messages_by_status(
                self.config.direction,
                MessageStatus::Claiming,
                self.config.max_fetch_messages_from_db,
            )
            .await?;

        for message in messages {
            let hash = message.message_hash;
            let now = unix_timestamp();
            let started_at = message.claim_tx_broadcasted_at.unwrap_or(message.updated_at);
            let age = now.saturating_sub(started_at);
            let timeout = self.config.message_submission_timeout.as_secs();

            let Some(transaction_hash) = message.claim_tx_hash else {
                // the broadcast outcome is unknown, nothing to look up before the timeout
                if age < timeout {
                    continue;
                }
                match self.replaced_claim_receipt(&message).await {
                    Ok(Some(receipt)) => {
                        if self.claimed(&message, receipt, now).await? {
                            summary.claimed += 1;
                        }
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(target: "postman::claimer", ?hash, %err, "Failed to fetch replaced claim receipt.");
                        continue;
                    }
                }
                match self.client.claim_status(&message).await {
                    Ok(OnChainMessageStatus::Claimed) => {
                        let transition = MessageTransition::to(MessageStatus::ClaimedExternal);
                        if self.apply(&message, MessageStatus::Claiming, transition).await? {
                            self.recorder.record_claimed_external();
                            summary.claimed_external += 1;
                        }
                    }
                    Ok(_) => {
                        if self.fail(&message, ClaimFailure::Dropped).await? {
                            summary.failed += 1;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(target: "postman::claimer", ?hash, %err, "Failed to resolve ambiguous claim.");
                    }
                }
                continue;
            };

            let receipt = match self.sender.receipt(transaction_hash).await {
                Ok(receipt) => receipt,
                Err(err) => {
                    tracing::warn!(target: "postman::claimer", ?hash, ?transaction_hash, %err, "Failed to fetch claim receipt.");
                    continue;
                }
            };

            match receipt {
                Some(receipt) if receipt.success => {
                    if self.claimed(&message, receipt, now).await? {
                        summary.claimed += 1;
                    }
                }
                Some(receipt) => {
                    tracing::warn!(target: "postman::claimer", ?hash, ?transaction_hash, block_number = receipt.block_number, "Claim transaction reverted.");
                    if self.fail(&message, ClaimFailure::Reverted).await? {
                        summary.failed += 1;
                    }
                }
                None if age < timeout => {}
                None => {
                    // the replaced transaction may have been mined on the shared nonce instead
                    match self.replaced_claim_receipt(&message).await {
                        Ok(Some(receipt)) => {
                            if self.claimed(&message, receipt, now).await? {
                                summary.claimed += 1;
                            }
                            continue;
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(target: "postman::claimer", ?hash, %err, "Failed to fetch replaced claim receipt.");
                            continue;
                        }
                    }

                    let grace = self.config.drop_grace_period.as_secs();
                    if age < timeout.saturating_add(grace) {
                        tracing::debug!(target: "postman::claimer", ?hash, ?transaction_hash, age, "Claim transaction not mined yet.");
                        continue;
                    }
                    let pending = self.sender.pending_transaction(transaction_hash).await.ok();
                    tracing::warn!(target: "postman::claimer", ?hash, ?transaction_hash, age, ?pending, "Claim transaction dropped.");
                    if self.fail(&message, ClaimFailure::Dropped).await? {
                        summary.failed += 1;
                    }
                }
            }
        }

        Ok(())
    }

    async fn retry_failed(&self, summary: &mut ReconcilerSummary) -> Result<(), ClaimerError> {
        let updated_before =
            unix_timestamp().saturating_sub(self.config.retry_delay.as_secs());
        let messages = self
            .database
            .get_messages_updated_before(
                self.config.direction,
                MessageStatus::ClaimFailed,
                updated_before,
                self.config.max_fetch_messages_from_db,
            )
            .await?;

        for message in messages {
            if message.retry_count < self.config.max_retries {
                let transition = MessageTransition::to(MessageStatus::Ready);
                if self.apply(&message, MessageStatus::ClaimFailed, transition).await? {
                    tracing::info!(target: "postman::claimer", hash = ?message.message_hash, retry_count = message.retry_count, "Retrying failed claim.");
                    self.recorder.record_retry();
                    summary.retried += 1;
                }
            } else {
                let transition = MessageTransition::to(MessageStatus::ClaimFailedTerminal);
                if self.apply(&message, MessageStatus::ClaimFailed, transition).await? {
                    tracing::error!(
                        target: "postman::claimer",
                        hash = ?message.message_hash,
                        retry_count = message.retry_count,
                        failure = ?message.claim_failure,
                        "Claim failed too many times, manual intervention needed."
                    );
                    self.recorder.record_terminal();
                    summary.terminal += 1;
                }
            }
        }

        Ok(())
    }

    async fn resweep_exclusions(
        &self,
        summary: &mut ReconcilerSummary,
    ) -> Result<(), ClaimerError> {
        let updated_before =
            unix_timestamp().saturating_sub(self.config.exclusion_resweep_interval.as_secs());
        let messages = self
            .database
            .get_economically_excluded_messages(
                self.config.direction,
                updated_before,
                self.config.max_fetch_messages_from_db,
            )
            .await?;

        for message in messages {
            let transition = MessageTransition::to(MessageStatus::Anchored);
            if self.apply(&message, MessageStatus::Excluded, transition).await? {
                tracing::debug!(target: "postman::claimer", hash = ?message.message_hash, reason = ?message.exclusion_reason, "Re-evaluating excluded message.");
                summary.reswept += 1;
            }
        }
        if summary.reswept > 0 {
            tracing::info!(target: "postman::claimer", reswept = summary.reswept, "Re-swept economic exclusions.");
        }

        Ok(())
    }

    /// Returns the successful receipt of the claim transaction the last one replaced.
    async fn replaced_claim_receipt(
        &self,
        message: &Message,
    ) -> Result<Option<ClaimReceipt>, ProviderError> {
        let Some(replaced) = message.claim_tx_replaced_hash else { return Ok(None) };
        Ok(self.sender.receipt(replaced).await?.filter(|receipt| receipt.success))
    }

    async fn claimed(
        &self,
        message: &Message,
        receipt: ClaimReceipt,
        now: u64,
    ) -> Result<bool, ClaimerError> {
        let transition = MessageTransition::claimed(receipt);
        let applied = self.apply(message, MessageStatus::Claiming, transition).await?;
        if applied {
            self.recorder.record_claim(message, &receipt, now);
        }
        Ok(applied)
    }

    async fn fail(&self, message: &Message, failure: ClaimFailure) -> Result<bool, ClaimerError> {
        let applied = self
            .apply(message, MessageStatus::Claiming, MessageTransition::claim_failed(failure))
            .await?;
        if applied {
            self.recorder.record_failure(failure);
        }
        Ok(applied)
    }

    async fn apply(
        &self,
        message: &Message,
        from: MessageStatus,
        transition: MessageTransition,
    ) -> Result<bool, ClaimerError> {
        let outcome =
            self.database.transition_message(message.message_hash, from, transition).await?;
        Ok(outcome.is_applied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256, U256};
    use postman_db::{test_utils::setup_test_db, ClaimTransactionDetails};
    use postman_primitives::{Direction, ExclusionReason, GasFees, MessageSentEvent};
    use postman_providers::test_utils::MockChain;
    use std::time::Duration;

    const DIRECTION: Direction = Direction::L1ToL2;

    fn config() -> ReconcilerConfig {
        ReconcilerConfig {
            direction: DIRECTION,
            max_fetch_messages_from_db: 100,
            message_submission_timeout: Duration::ZERO,
            drop_grace_period: Duration::from_secs(3600),
            retry_delay: Duration::ZERO,
            max_retries: 3,
            exclusion_resweep_interval: Duration::ZERO,
        }
    }

    fn event(hash: u8) -> MessageSentEvent {
        MessageSentEvent {
            message_hash: B256::with_last_byte(hash),
            sender: Address::repeat_byte(2),
            recipient: Address::repeat_byte(3),
            fee: U256::from(1_000_000),
            value: U256::ZERO,
            nonce: U256::from(hash),
            calldata: Bytes::new(),
            block_number: 1,
            transaction_hash: B256::repeat_byte(4),
            log_index: 0,
        }
    }

    /// Inserts a claiming message, with a claim transaction if `transaction_hash` is set.
    async fn insert_claiming(
        db: &Database,
        hash: u8,
        transaction_hash: Option<B256>,
    ) -> eyre::Result<B256> {
        let message = Message::from_event(event(hash), DIRECTION, MessageStatus::Sent, None, 0);
        let hash = message.message_hash;
        db.insert_message(message).await?;
        for (from, transition) in [
            (MessageStatus::Sent, MessageTransition::to(MessageStatus::Anchored)),
            (MessageStatus::Anchored, MessageTransition::ready(100_000, 100, 10)),
            (MessageStatus::Ready, MessageTransition::claiming(unix_timestamp())),
        ] {
            db.transition_message(hash, from, transition).await?;
        }
        if let Some(transaction_hash) = transaction_hash {
            let details = ClaimTransactionDetails {
                hash: Some(transaction_hash),
                nonce: hash[31] as u64,
                gas_limit: 100_000,
                fees: GasFees::new(10, 1),
                broadcasted_at: unix_timestamp(),
            };
            db.record_claim_transaction(hash, details).await?;
        }
        Ok(hash)
    }

    fn receipt(transaction_hash: B256, success: bool) -> ClaimReceipt {
        ClaimReceipt {
            transaction_hash,
            block_number: 42,
            success,
            gas_used: 80_000,
            effective_gas_price: 7,
        }
    }

    #[tokio::test]
    async fn test_success_receipt_claims() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let transaction_hash = B256::repeat_byte(0xaa);
        let hash = insert_claiming(&db, 1, Some(transaction_hash)).await?;
        chain.state().receipts.insert(transaction_hash, receipt(transaction_hash, true));
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config());

        let summary = reconciler.tick().await?;

        assert_eq!(summary, ReconcilerSummary { claimed: 1, ..Default::default() });
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Claimed);
        assert_eq!(message.claimed_block_number, Some(42));
        assert_eq!(message.claim_gas_used, Some(80_000));
        assert_eq!(message.claim_effective_gas_price, Some(7));
        Ok(())
    }

    #[tokio::test]
    async fn test_revert_fails_then_retries() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let transaction_hash = B256::repeat_byte(0xaa);
        let hash = insert_claiming(&db, 1, Some(transaction_hash)).await?;
        chain.state().receipts.insert(transaction_hash, receipt(transaction_hash, false));
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config());

        let summary = reconciler.tick().await?;

        assert_eq!(summary, ReconcilerSummary { failed: 1, retried: 1, ..Default::default() });
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Ready);
        assert_eq!(message.retry_count, 1);
        assert_eq!(message.claim_failure, Some(ClaimFailure::Reverted));
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_waits_for_delay() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let transaction_hash = B256::repeat_byte(0xaa);
        let hash = insert_claiming(&db, 1, Some(transaction_hash)).await?;
        chain.state().receipts.insert(transaction_hash, receipt(transaction_hash, false));
        let config = ReconcilerConfig { retry_delay: Duration::from_secs(3600), ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);

        let summary = reconciler.tick().await?;

        assert_eq!(summary, ReconcilerSummary { failed: 1, ..Default::default() });
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::ClaimFailed));
        Ok(())
    }

    #[tokio::test]
    async fn test_unmined_claim_waits_for_grace_period() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let transaction_hash = B256::repeat_byte(0xaa);
        let hash = insert_claiming(&db, 1, Some(transaction_hash)).await?;
        chain.state().mempool.insert(transaction_hash);
        let config = ReconcilerConfig { retry_delay: Duration::from_secs(3600), ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain.clone(), db.clone(), config);

        // still known to the node within the grace period
        assert_eq!(reconciler.tick().await?, ReconcilerSummary::default());
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::Claiming));

        // unknown to the queried node, but the grace period is not over
        chain.drop_transaction(transaction_hash);
        assert_eq!(reconciler.tick().await?, ReconcilerSummary::default());
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::Claiming));

        let config = ReconcilerConfig { drop_grace_period: Duration::ZERO, ..config };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);
        assert_eq!(reconciler.tick().await?.failed, 1);
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::ClaimFailed);
        assert_eq!(message.claim_failure, Some(ClaimFailure::Dropped));
        Ok(())
    }

    #[tokio::test]
    async fn test_replaced_claim_mined_on_shared_nonce() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let original = B256::repeat_byte(0xaa);
        let hash = insert_claiming(&db, 1, Some(original)).await?;

        // the original is replaced on the same nonce
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
        db.transition_message(
            hash,
            MessageStatus::Ready,
            MessageTransition::claiming(unix_timestamp()),
        )
        .await?;
        let replacement = ClaimTransactionDetails {
            hash: Some(B256::repeat_byte(0xbb)),
            nonce: 1,
            gas_limit: 100_000,
            fees: GasFees::new(11, 2),
            broadcasted_at: unix_timestamp(),
        };
        db.record_claim_transaction(hash, replacement).await?;

        // the original is mined after all
        chain.state().receipts.insert(original, receipt(original, true));
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config());

        let summary = reconciler.tick().await?;

        assert_eq!(summary, ReconcilerSummary { claimed: 1, ..Default::default() });
        let message = db.get_message(hash).await?.expect("message exists");
        assert_eq!(message.status, MessageStatus::Claimed);
        assert_eq!(message.claim_tx_hash, Some(original));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_receipt_before_timeout_is_not_an_error() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_claiming(&db, 1, Some(B256::repeat_byte(0xaa))).await?;
        let config =
            ReconcilerConfig { message_submission_timeout: Duration::from_secs(3600), ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);

        assert_eq!(reconciler.tick().await?, ReconcilerSummary::default());
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::Claiming));
        Ok(())
    }

    #[tokio::test]
    async fn test_ambiguous_claim_resolution() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let external = insert_claiming(&db, 1, None).await?;
        let dropped = insert_claiming(&db, 2, None).await?;
        chain.state().claim_statuses.insert(external, OnChainMessageStatus::Claimed);
        let config = ReconcilerConfig { retry_delay: Duration::from_secs(3600), ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);

        let summary = reconciler.tick().await?;

        assert_eq!(
            summary,
            ReconcilerSummary { claimed_external: 1, failed: 1, ..Default::default() }
        );
        assert_eq!(
            db.get_message(external).await?.map(|m| m.status),
            Some(MessageStatus::ClaimedExternal)
        );
        let dropped = db.get_message(dropped).await?.expect("message exists");
        assert_eq!(dropped.status, MessageStatus::ClaimFailed);
        assert_eq!(dropped.claim_failure, Some(ClaimFailure::Dropped));
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_count_is_bounded() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let hash = insert_claiming(&db, 1, None).await?;
        let config = ReconcilerConfig { max_retries: 2, ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);

        for attempt in 1..=5u8 {
            reconciler.tick().await?;
            let message = db.get_message(hash).await?.expect("message exists");
            assert!(message.retry_count <= 2);
            if message.status == MessageStatus::ClaimFailedTerminal {
                assert_eq!(message.retry_count, 2);
                assert_eq!(attempt, 2);
                return Ok(());
            }
            // the retried message is claimed again without a transaction hash
            db.transition_message(hash, MessageStatus::Ready, MessageTransition::claiming(0))
                .await?;
        }
        panic!("message never became terminal");
    }

    #[tokio::test]
    async fn test_resweep_only_economic_exclusions() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let mut hashes = Vec::new();
        let reasons = [
            ExclusionReason::Underpriced,
            ExclusionReason::RateLimited,
            ExclusionReason::GasLimitExceeded,
        ];
        for (i, reason) in reasons.into_iter().enumerate() {
            let event = event(i as u8 + 1);
            let message = Message::from_event(event, DIRECTION, MessageStatus::Sent, None, 0);
            let hash = message.message_hash;
            db.insert_message(message).await?;
            db.transition_message(
                hash,
                MessageStatus::Sent,
                MessageTransition::to(MessageStatus::Anchored),
            )
            .await?;
            db.transition_message(
                hash,
                MessageStatus::Anchored,
                MessageTransition::excluded(reason),
            )
            .await?;
            hashes.push(hash);
        }
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config());

        let summary = reconciler.tick().await?;

        assert_eq!(summary, ReconcilerSummary { reswept: 2, ..Default::default() });
        let statuses = statuses_of(&db, &hashes).await?;
        assert_eq!(
            statuses,
            vec![MessageStatus::Anchored, MessageStatus::Anchored, MessageStatus::Excluded]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_resweep_interval() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let chain = MockChain::new();
        let config =
            ReconcilerConfig { exclusion_resweep_interval: Duration::from_secs(3600), ..config() };
        let mut reconciler = Reconciler::new(chain.clone(), chain, db.clone(), config);
        reconciler.tick().await?;

        let message = Message::from_event(event(1), DIRECTION, MessageStatus::Sent, None, 0);
        let hash = message.message_hash;
        db.insert_message(message).await?;
        db.transition_message(
            hash,
            MessageStatus::Sent,
            MessageTransition::to(MessageStatus::Anchored),
        )
        .await?;
        db.transition_message(
            hash,
            MessageStatus::Anchored,
            MessageTransition::excluded(ExclusionReason::Underpriced),
        )
        .await?;

        // the interval did not elapse since the first sweep
        assert_eq!(reconciler.tick().await?.reswept, 0);
        assert_eq!(db.get_message(hash).await?.map(|m| m.status), Some(MessageStatus::Excluded));
        Ok(())
    }

    async fn statuses_of(db: &Database, hashes: &[B256]) -> eyre::Result<Vec<MessageStatus>> {
        let mut statuses = Vec::with_capacity(hashes.len());
        for hash in hashes {
            statuses.push(db.get_message(*hash).await?.expect("message exists").status);
        }
        Ok(statuses)
    }
}
