//! End to end scenarios of a relayed direction over in-memory chains.

use alloy_primitives::{Address, Bytes, B256, U256};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use postman_claimer::{
    ClaimPayloadConfig, GasFeeConfig, GateConfig, ReconcilerConfig, SubmitterConfig,
};
use postman_db::{test_utils::setup_test_db, Database, DatabaseOperations};
use postman_indexer::{AnchoringTrackerConfig, MessageFilter, MessageSentIndexerConfig};
use postman_node::{Pipeline, PipelineChains, PipelineConfig, PollerConfig};
use postman_primitives::{
    AnchoringEvent, AnchoringId, ClaimFailure, Direction, ExclusionReason, Message, MessageProof,
    MessageSentEvent, MessageStatus, OnChainMessageStatus,
};
use postman_providers::test_utils::MockChain;
use postman_signer::NonceManagerConfig;
use std::{collections::HashSet, sync::Arc, time::Duration};

const GWEI: u128 = 1_000_000_000;

fn config(direction: Direction) -> PipelineConfig {
    let poller =
        PollerConfig { interval: Duration::from_millis(10), max_backoff: Duration::from_secs(1) };
    PipelineConfig {
        indexer: MessageSentIndexerConfig {
            direction,
            initial_from_block: 0,
            block_confirmation: 0,
            max_blocks_to_fetch_logs: 1_000,
            filter: MessageFilter::default(),
        },
        anchoring: AnchoringTrackerConfig {
            direction,
            initial_from_block: 0,
            anchoring_confirmations: 0,
            max_blocks_to_fetch_logs: 1_000,
            max_fetch_messages_from_db: 100,
        },
        fees: GasFeeConfig {
            block_count: 10,
            percentile: 15.0,
            max_fee_per_gas_cap: 100 * GWEI,
            enforce_max_gas_fee: false,
        },
        payload: ClaimPayloadConfig { fee_recipient: Address::ZERO, claim_via_address: None },
        gate: GateConfig {
            direction,
            max_fetch_messages_from_db: 100,
            profit_margin: 0.0,
            max_claim_gas_limit: 500_000,
            rate_limit_margin: 0.95,
            is_postman_sponsorship_enabled: false,
            max_postman_sponsor_gas_limit: 250_000,
            reserved_recipients: HashSet::new(),
        },
        submitter: SubmitterConfig { direction, max_claims_per_tick: 10, price_bump_percent: 10 },
        reconciler: ReconcilerConfig {
            direction,
            max_fetch_messages_from_db: 100,
            message_submission_timeout: Duration::ZERO,
            drop_grace_period: Duration::ZERO,
            retry_delay: Duration::ZERO,
            max_retries: 3,
            exclusion_resweep_interval: Duration::ZERO,
        },
        nonce_manager: NonceManagerConfig { direction, max_nonce_diff: 10 },
        listener_poller: poller,
        claiming_poller: poller,
    }
}

type MockPipeline = Pipeline<MockChain, MockChain, MockChain, MockChain>;

/// Two in-memory chains and a pipeline relaying messages between them.
struct Harness {
    source: MockChain,
    destination: MockChain,
    database: Arc<Database>,
    direction: Direction,
    pipeline: MockPipeline,
    metrics: Snapshotter,
}

impl Harness {
    async fn new(config: PipelineConfig) -> Self {
        let source = MockChain::new();
        let destination = MockChain::new();
        source.state().head = 10;
        destination.state().head = 10;
        let database = Arc::new(setup_test_db().await);
        let direction = config.indexer.direction;
        // the metric handles are registered when the components are built
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let pipeline = metrics::with_local_recorder(&recorder, || {
            Self::pipeline(&source, &destination, &database, &config)
        });
        Self { source, destination, database, direction, pipeline, metrics: snapshotter }
    }

    fn pipeline(
        source: &MockChain,
        destination: &MockChain,
        database: &Arc<Database>,
        config: &PipelineConfig,
    ) -> MockPipeline {
        let chains = PipelineChains {
            source: source.clone(),
            destination: destination.clone(),
            client: destination.clone(),
            sender: destination.clone(),
        };
        Pipeline::new(chains, database.clone(), config)
    }

    /// Emits a message on the source chain and anchors it on the destination chain.
    fn send(&self, hash: u8, fee: U256, calldata: Bytes) -> B256 {
        let message_hash = B256::with_last_byte(hash);
        let block_number = 5;
        self.source.state().message_events.push(MessageSentEvent {
            message_hash,
            sender: Address::repeat_byte(2),
            recipient: Address::repeat_byte(3),
            fee,
            value: U256::ZERO,
            nonce: U256::from(hash),
            calldata,
            block_number,
            transaction_hash: B256::repeat_byte(4),
            log_index: hash as u64,
        });
        let id = match self.direction {
            Direction::L1ToL2 => AnchoringId::MessageHash(message_hash),
            Direction::L2ToL1 => AnchoringId::SourceBlock(block_number),
        };
        self.destination.state().anchoring_events.push(AnchoringEvent { id, block_number: 6 });
        message_hash
    }

    /// Indexes, anchors and validates the pending messages.
    async fn validate(&mut self) -> eyre::Result<()> {
        self.pipeline.indexer.tick().await?;
        self.pipeline.anchoring.tick().await?;
        self.pipeline.gate.tick().await?;
        Ok(())
    }

    /// Returns the value of the counter of the direction with the provided extra labels.
    fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let direction = self.direction.to_string();
        self.metrics
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| {
                let key = key.key();
                let matches = key.name() == name &&
                    key.labels().any(|l| l.key() == "direction" && l.value() == direction) &&
                    labels
                        .iter()
                        .all(|(k, v)| key.labels().any(|l| l.key() == *k && l.value() == *v));
                match value {
                    DebugValue::Counter(count) if matches => Some(count),
                    _ => None,
                }
            })
            .unwrap_or_default()
    }

    async fn message(&self, hash: B256) -> eyre::Result<Message> {
        self.database.get_message(hash).await?.ok_or_else(|| eyre::eyre!("missing message {hash}"))
    }
}

fn ether(value: u64) -> U256 {
    U256::from(value) * U256::from(10u64).pow(U256::from(18))
}

#[tokio::test]
async fn test_zero_fee_message_is_excluded() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L1ToL2)).await;
    let hash = harness.send(1, U256::ZERO, Bytes::new());

    harness.validate().await?;
    harness.pipeline.submitter.tick().await?;

    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Excluded);
    assert_eq!(message.exclusion_reason, Some(ExclusionReason::ZeroFee));
    assert!(harness.destination.broadcast_hashes().is_empty());
    assert_eq!(harness.counter("postman_claimer.excluded", &[("reason", "ZERO_FEE")]), 1);
    assert_eq!(harness.counter("postman_claimer.excluded", &[("reason", "UNDERPRICED")]), 0);
    Ok(())
}

#[tokio::test]
async fn test_underpriced_message_is_reswept_once_fees_drop() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L1ToL2)).await;
    // 100_000 gas at 2.1 gwei costs 2.1e14 wei
    let hash = harness.send(1, U256::from(100_000_000_000_000u64), Bytes::new());

    harness.validate().await?;
    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Excluded);
    assert_eq!(message.exclusion_reason, Some(ExclusionReason::Underpriced));

    // the fee market drops to 0.3 gwei
    {
        let mut state = harness.destination.state();
        state.head += 1;
        state.fee_history.next_base_fee_per_gas = 100_000_000;
    }
    assert_eq!(harness.pipeline.reconciler.tick().await?.reswept, 1);
    harness.pipeline.gate.tick().await?;

    assert_eq!(harness.message(hash).await?.status, MessageStatus::Ready);
    Ok(())
}

#[tokio::test]
async fn test_happy_path_claims_message() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L1ToL2)).await;
    let hash = harness.send(1, ether(1), Bytes::new());

    harness.validate().await?;
    assert_eq!(harness.message(hash).await?.status, MessageStatus::Ready);

    let submitted = harness.pipeline.submitter.tick().await?;
    assert_eq!(submitted.broadcast, 1);
    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Claiming);
    let transaction_hash = message.claim_tx_hash.ok_or_else(|| eyre::eyre!("missing claim"))?;
    assert_eq!(message.claim_tx_nonce, Some(0));

    harness.destination.mine(transaction_hash, true, 90_000, 2 * GWEI);
    let reconciled = harness.pipeline.reconciler.tick().await?;

    assert_eq!(reconciled.claimed, 1);
    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Claimed);
    assert_eq!(message.claim_gas_used, Some(90_000));
    assert_eq!(harness.destination.broadcast_hashes(), vec![transaction_hash]);
    assert_eq!(harness.counter("postman_claimer.claimed", &[]), 1);
    assert_eq!(harness.counter("postman_claimer.broadcasts", &[]), 1);
    assert_eq!(harness.counter("postman_claimer.claimed_external", &[]), 0);
    Ok(())
}

#[tokio::test]
async fn test_l2_to_l1_claim_carries_proof() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L2ToL1)).await;
    harness.destination.state().proof = MessageProof {
        proof: vec![B256::repeat_byte(7)],
        root: B256::repeat_byte(8),
        leaf_index: 1,
    };
    let hash = harness.send(1, ether(1), Bytes::new());

    harness.validate().await?;
    harness.pipeline.submitter.tick().await?;

    assert_eq!(harness.message(hash).await?.status, MessageStatus::Claiming);
    let (transaction, _, _) = harness.destination.state().broadcasts[0].clone();
    let call = postman_abi::ClaimCall::try_decode(&transaction.input);
    assert!(matches!(call, Some(postman_abi::ClaimCall::ClaimWithProof(_))));
    Ok(())
}

#[tokio::test]
async fn test_timed_out_claim_is_retried() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L1ToL2)).await;
    let hash = harness.send(1, ether(1), Bytes::new());
    harness.validate().await?;
    harness.pipeline.submitter.tick().await?;
    let first = harness.message(hash).await?;
    let first_hash = first.claim_tx_hash.ok_or_else(|| eyre::eyre!("missing claim"))?;

    // never mined and no longer known to the node
    harness.destination.drop_transaction(first_hash);
    let reconciled = harness.pipeline.reconciler.tick().await?;

    assert_eq!((reconciled.failed, reconciled.retried), (1, 1));
    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Ready);
    assert_eq!(message.claim_failure, Some(ClaimFailure::Dropped));
    assert_eq!(message.retry_count, 1);

    // the retry replaces the dropped transaction with bumped fees
    harness.pipeline.submitter.tick().await?;
    let broadcasts = harness.destination.state().broadcasts.clone();
    assert_eq!(broadcasts.len(), 2);
    assert_eq!(broadcasts[1].1, broadcasts[0].1);
    assert!(broadcasts[1].0.fees.max_fee_per_gas > broadcasts[0].0.fees.max_fee_per_gas);
    Ok(())
}

#[tokio::test]
async fn test_externally_claimed_message_is_not_broadcast() -> eyre::Result<()> {
    let mut harness = Harness::new(config(Direction::L1ToL2)).await;
    let hash = harness.send(1, ether(1), Bytes::new());
    harness.destination.state().claim_statuses.insert(hash, OnChainMessageStatus::Claimed);

    harness.validate().await?;
    harness.pipeline.submitter.tick().await?;

    assert_eq!(harness.message(hash).await?.status, MessageStatus::ClaimedExternal);
    assert!(harness.destination.broadcast_hashes().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_filtered_message_is_stored_excluded() -> eyre::Result<()> {
    let mut config = config(Direction::L1ToL2);
    config.indexer.filter.is_calldata_enabled = false;
    let mut harness = Harness::new(config).await;
    let hash = harness.send(1, ether(1), Bytes::from_static(&[0xde, 0xad]));

    harness.validate().await?;

    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::Excluded);
    assert_eq!(message.exclusion_reason, Some(ExclusionReason::Filtered));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_submitters_claim_at_most_once() -> eyre::Result<()> {
    let config = config(Direction::L1ToL2);
    let mut harness = Harness::new(config.clone()).await;
    let hash = harness.send(1, ether(1), Bytes::new());
    harness.validate().await?;

    let mut other =
        Harness::pipeline(&harness.source, &harness.destination, &harness.database, &config);
    let (first, second) =
        tokio::join!(harness.pipeline.submitter.tick(), other.submitter.tick());

    assert_eq!(first?.broadcast + second?.broadcast, 1);
    assert_eq!(harness.destination.broadcast_hashes().len(), 1);
    assert_eq!(harness.message(hash).await?.status, MessageStatus::Claiming);
    Ok(())
}

#[tokio::test]
async fn test_retries_are_bounded() -> eyre::Result<()> {
    let mut config = config(Direction::L1ToL2);
    config.reconciler.max_retries = 2;
    let mut harness = Harness::new(config).await;
    let hash = harness.send(1, ether(1), Bytes::new());
    harness.validate().await?;

    for _ in 0..4 {
        if harness.pipeline.submitter.tick().await?.broadcast == 1 {
            let claim = harness.message(hash).await?.claim_tx_hash;
            let claim = claim.ok_or_else(|| eyre::eyre!("missing claim"))?;
            harness.destination.mine(claim, false, 50_000, GWEI);
        }
        harness.pipeline.reconciler.tick().await?;
    }

    let message = harness.message(hash).await?;
    assert_eq!(message.status, MessageStatus::ClaimFailedTerminal);
    assert_eq!(message.retry_count, 2);
    assert_eq!(message.claim_failure, Some(ClaimFailure::Reverted));
    assert_eq!(harness.destination.broadcast_hashes().len(), 2);
    Ok(())
}
