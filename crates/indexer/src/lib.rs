//! A library responsible for indexing the messages and anchoring events of a bridge corridor.
//!
//! The [`MessageSentIndexer`] stores the messages emitted on the source chain and the
//! [`AnchoringTracker`] promotes them to `ANCHORED` once the destination chain has anchored them
//! with enough confirmations. Both advance a watermark only after the writes for the indexed
//! range are committed, so a failed tick is retried from the same block.

use alloy_primitives::{Address, B256};
use postman_db::{Database, DatabaseOperations, MessageTransition, WatermarkKind};
use postman_primitives::{
    unix_timestamp, Direction, ExclusionReason, Message, MessageSentEvent, MessageStatus,
};
use postman_providers::ChainLogSource;
use std::{ops::RangeInclusive, sync::Arc, time::Instant};

mod error;
pub use error::IndexerError;

mod event;
pub use event::IndexerEvent;

mod metrics;
pub use metrics::{AnchoringMetrics, IndexerItem, IndexerMetrics, MessageFilterMetrics};

/// The filters applied to the observed messages. A message that does not pass them is stored as
/// [`ExclusionReason::Filtered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFilter {
    /// Whether messages without calldata are relayed.
    pub is_eoa_enabled: bool,
    /// Whether messages with calldata are relayed.
    pub is_calldata_enabled: bool,
    /// Only relay messages sent by this address.
    pub from_address: Option<Address>,
    /// Only relay messages sent to this address.
    pub to_address: Option<Address>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            is_eoa_enabled: true,
            is_calldata_enabled: true,
            from_address: None,
            to_address: None,
        }
    }
}

impl MessageFilter {
    /// Returns true if the message should be relayed.
    pub fn accepts(&self, event: &MessageSentEvent) -> bool {
        let enabled =
            if event.calldata.is_empty() { self.is_eoa_enabled } else { self.is_calldata_enabled };
        enabled &&
            self.from_address.is_none_or(|from| from == event.sender) &&
            self.to_address.is_none_or(|to| to == event.recipient)
    }
}

/// The configuration of the [`MessageSentIndexer`].
#[derive(Debug, Clone, Copy)]
pub struct MessageSentIndexerConfig {
    /// The direction of the indexed messages.
    pub direction: Direction,
    /// The first block to index when no watermark is stored.
    pub initial_from_block: u64,
    /// The depth below the source head past which blocks are indexed.
    pub block_confirmation: u64,
    /// The maximum number of blocks fetched in a tick.
    pub max_blocks_to_fetch_logs: u64,
    /// The message filters.
    pub filter: MessageFilter,
}

/// Returns the next block range to index, bounded by the safe block and the batch size. Returns
/// [`None`] if the watermark already reached the safe block.
fn next_range(
    watermark: Option<u64>,
    initial_from_block: u64,
    head: u64,
    confirmations: u64,
    max_blocks: u64,
) -> Option<RangeInclusive<u64>> {
    let safe_block = head.checked_sub(confirmations)?;
    let from = watermark.map_or(initial_from_block, |w| w + 1);
    let to = safe_block.min(from.saturating_add(max_blocks.max(1) - 1));
    (from <= to).then_some(from..=to)
}

/// The indexer stores the messages sent on the source chain.
#[derive(Debug)]
pub struct MessageSentIndexer<S> {
    /// The source chain log source.
    source: S,
    /// A reference to the database used to persist the indexed data.
    database: Arc<Database>,
    /// The configuration.
    config: MessageSentIndexerConfig,
    /// The indexer metrics.
    metrics: IndexerMetrics,
    /// The filter metrics.
    filter_metrics: MessageFilterMetrics,
}

impl<S: ChainLogSource> MessageSentIndexer<S> {
    /// Creates a new indexer with the given [`Database`].
    pub fn new(source: S, database: Arc<Database>, config: MessageSentIndexerConfig) -> Self {
        let labels = [
            ("item", IndexerItem::MessageSent.as_str().to_string()),
            ("direction", config.direction.to_string()),
        ];
        Self {
            source,
            database,
            config,
            metrics: IndexerMetrics::new_with_labels(&labels),
            filter_metrics: MessageFilterMetrics::new_with_labels(&labels[1..]),
        }
    }

    /// Indexes the next range of source blocks.
    #[tracing::instrument(target = "postman::indexer", skip_all, fields(direction = %self.config.direction))]
    pub async fn tick(&mut self) -> Result<IndexerEvent, IndexerError> {
        let now = Instant::now();
        let result = self.index_next_range().await;
        self.metrics.task_duration.record(now.elapsed().as_secs_f64());
        result
    }

    async fn index_next_range(&mut self) -> Result<IndexerEvent, IndexerError> {
        let config = &self.config;
        let head = self.source.block_number().await?;
        let watermark =
            self.database.get_watermark(config.direction, WatermarkKind::MessageSent).await?;
        let Some(range) = next_range(
            watermark,
            config.initial_from_block,
            head,
            config.block_confirmation,
            config.max_blocks_to_fetch_logs,
        ) else {
            return Ok(IndexerEvent::UpToDate { head });
        };

        let events = self.source.message_sent_events(*range.start(), *range.end()).await?;

        // create a database transaction so the inserts and the watermark are committed together
        let txn = self.database.tx().await?;
        let timestamp = unix_timestamp();
        let (mut inserted, mut filtered, mut duplicates) = (0, 0, 0);
        for event in events {
            let hash = event.message_hash;
            let accepted = config.filter.accepts(&event);
            let message = if accepted {
                Message::from_event(event, config.direction, MessageStatus::Sent, None, timestamp)
            } else {
                Message::from_event(
                    event,
                    config.direction,
                    MessageStatus::Excluded,
                    Some(ExclusionReason::Filtered),
                    timestamp,
                )
            };

            if !txn.insert_message(message).await? {
                duplicates += 1;
            } else if accepted {
                tracing::debug!(target: "postman::indexer", ?hash, "Indexed message.");
                inserted += 1;
            } else {
                tracing::debug!(target: "postman::indexer", ?hash, "Indexed filtered message.");
                filtered += 1;
            }
        }
        txn.set_watermark(config.direction, WatermarkKind::MessageSent, *range.end()).await?;
        txn.commit().await?;

        self.metrics.watermark.set(*range.end() as f64);
        self.metrics.indexed.increment(inserted as u64);
        self.filter_metrics.filtered.increment(filtered as u64);
        tracing::info!(target: "postman::indexer", from = range.start(), to = range.end(), inserted, filtered, duplicates, "Indexed message-sent events.");

        Ok(IndexerEvent::MessagesIndexed { range, inserted, filtered, duplicates })
    }
}

/// The configuration of the [`AnchoringTracker`].
#[derive(Debug, Clone, Copy)]
pub struct AnchoringTrackerConfig {
    /// The direction of the tracked messages.
    pub direction: Direction,
    /// The first destination block to index when no watermark is stored.
    pub initial_from_block: u64,
    /// The depth below the destination head past which anchoring events are indexed.
    pub anchoring_confirmations: u64,
    /// The maximum number of blocks fetched in a tick.
    pub max_blocks_to_fetch_logs: u64,
    /// The maximum number of `SENT` messages considered in a tick.
    pub max_fetch_messages_from_db: u64,
}

/// The tracker records the anchoring events of the destination chain and promotes the anchored
/// messages.
///
/// Each tick promotes one page of `SENT` messages. The tracker remembers where the page ended and
/// continues from there on the next tick, wrapping back to the oldest message once the last page
/// is reached, so messages that stay unanchored never hide the newer ones.

#[derive(Debug)]
pub struct AnchoringTracker<D> {
    /// The destination chain log source.
    destination: D,
    /// A reference to the database used to persist the anchoring records.
    database: Arc<Database>,
    /// The configuration.
    config: AnchoringTrackerConfig,
    /// The indexer metrics.
    metrics: IndexerMetrics,
    /// The promotion metrics.
    anchoring_metrics: AnchoringMetrics,
    /// The `(sent_block_number, message_hash)` of the last message of the previous page.
    cursor: Option<(u64, B256)>,
}

impl<D: ChainLogSource> AnchoringTracker<D> {
    /// Creates a new tracker with the given [`Database`].
    pub fn new(destination: D, database: Arc<Database>, config: AnchoringTrackerConfig) -> Self {
        let labels = [
            ("item", IndexerItem::Anchoring.as_str().to_string()),
            ("direction", config.direction.to_string()),
        ];
        Self {
            destination,
            database,
            config,
            metrics: IndexerMetrics::new_with_labels(&labels),
            anchoring_metrics: AnchoringMetrics::new_with_labels(&labels[1..]),
            cursor: None,
        }
    }

    /// Indexes the next range of anchoring events then promotes the anchored messages.
    #[tracing::instrument(target = "postman::indexer", skip_all, fields(direction = %self.config.direction))]
    pub async fn tick(&mut self) -> Result<IndexerEvent, IndexerError> {
        let now = Instant::now();
        let head = self.destination.block_number().await?;
        let result = match self.index_anchorings(head).await {
            Ok((range, anchorings)) => self
                .promote_anchored(head)
                .await
                .map(|anchored| IndexerEvent::AnchoringIndexed { range, anchorings, anchored }),
            Err(err) => Err(err),
        };
        self.metrics.task_duration.record(now.elapsed().as_secs_f64());
        result
    }

    async fn index_anchorings(
        &mut self,
        head: u64,
    ) -> Result<(Option<RangeInclusive<u64>>, usize), IndexerError> {
        let config = &self.config;
        let watermark =
            self.database.get_watermark(config.direction, WatermarkKind::Anchoring).await?;
        let Some(range) = next_range(
            watermark,
            config.initial_from_block,
            head,
            config.anchoring_confirmations,
            config.max_blocks_to_fetch_logs,
        ) else {
            return Ok((None, 0));
        };

        let (from, to) = (*range.start(), *range.end());
        let events = self.destination.anchoring_events(config.direction, from, to).await?;

        let txn = self.database.tx().await?;
        let mut anchorings = 0;
        for event in events {
            if txn.insert_anchoring(config.direction, event).await? {
                tracing::trace!(target: "postman::indexer", id = %event.id, block_number = event.block_number, "Indexed anchoring.");
                anchorings += 1;
            }
        }
        txn.set_watermark(config.direction, WatermarkKind::Anchoring, *range.end()).await?;
        txn.commit().await?;

        self.metrics.watermark.set(*range.end() as f64);
        self.metrics.indexed.increment(anchorings as u64);
        tracing::debug!(target: "postman::indexer", from = range.start(), to = range.end(), anchorings, "Indexed anchoring events.");

        Ok((Some(range), anchorings))
    }

    async fn promote_anchored(&mut self, head: u64) -> Result<usize, IndexerError> {
        let direction = self.config.direction;
        let limit = self.config.max_fetch_messages_from_db.max(1);
        let messages = self
            .database
            .get_messages_by_status_after(direction, MessageStatus::Sent, self.cursor, limit)
            .await?;
        self.cursor = match messages.last() {
            Some(last) if messages.len() as u64 == limit => {
                Some((last.sent_block_number, last.message_hash))
            }
            _ => None,
        };

        let mut anchored = 0;
        for message in messages {
            let Some(block_number) =
                self.database.get_anchoring_block(direction, message.anchoring_id()).await?
            else {
                continue;
            };

            let outcome = self
                .database
                .transition_message(
                    message.message_hash,
                    MessageStatus::Sent,
                    MessageTransition::to(MessageStatus::Anchored),
                )
                .await?;
            if outcome.is_applied() {
                let confirmations = head.saturating_sub(block_number) + 1;
                tracing::debug!(target: "postman::indexer", hash = ?message.message_hash, confirmations, "Message anchored.");
                anchored += 1;
            }
        }

        self.anchoring_metrics.anchored.increment(anchored as u64);
        if anchored > 0 {
            tracing::info!(target: "postman::indexer", anchored, "Promoted anchored messages.");
        }
        Ok(anchored)
    }
}
