use super::{models, DatabaseError};
use crate::{models::message::encode_wei, DatabaseConnectionProvider};

use alloy_primitives::B256;
use postman_primitives::{
    unix_timestamp, AnchoringEvent, AnchoringId, ClaimFailure, ClaimReceipt, Direction,
    ExclusionReason, GasFees, Message, MessageStatus,
};
use sea_orm::{
    sea_query::{Expr, Func, OnConflict},
    ActiveValue, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use strum::IntoEnumIterator;

/// The kind of event stream tracked by a watermark.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum WatermarkKind {
    /// Message-sent events on the source chain.
    #[strum(serialize = "message_sent")]
    MessageSent,
    /// Anchoring events on the destination chain.
    #[strum(serialize = "anchoring")]
    Anchoring,
}

fn watermark_key(direction: Direction, kind: WatermarkKind) -> String {
    format!("{direction}:{kind}")
}

/// The outcome of a conditional status transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The message was in the expected status and has been updated.
    Applied,
    /// The message was not in the expected status, another writer got there first.
    RaceLost,
}

impl TransitionOutcome {
    /// Returns true if the transition was applied.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// The details of a broadcast claim transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClaimTransactionDetails {
    /// The transaction hash, unknown if the node gave no answer to the broadcast.
    pub hash: Option<B256>,
    /// The transaction nonce.
    pub nonce: u64,
    /// The transaction gas limit.
    pub gas_limit: u64,
    /// The transaction fees.
    pub fees: GasFees,
    /// The unix timestamp of the broadcast.
    pub broadcasted_at: u64,
}

/// A status transition along with the columns written in the same conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTransition {
    to: MessageStatus,
    exclusion_reason: Option<ExclusionReason>,
    claim_failure: Option<ClaimFailure>,
    increment_retry_count: bool,
    claim_attempt_started_at: Option<u64>,
    claim_transaction: Option<ClaimTransactionDetails>,
    receipt: Option<ClaimReceipt>,
    estimate: Option<(u64, u64, u64)>,
}

impl MessageTransition {
    /// A plain transition to the provided status.
    pub const fn to(status: MessageStatus) -> Self {
        Self {
            to: status,
            exclusion_reason: None,
            claim_failure: None,
            increment_retry_count: false,
            claim_attempt_started_at: None,
            claim_transaction: None,
            receipt: None,
            estimate: None,
        }
    }

    /// A transition to [`MessageStatus::Excluded`] for the provided reason.
    pub const fn excluded(reason: ExclusionReason) -> Self {
        let mut transition = Self::to(MessageStatus::Excluded);
        transition.exclusion_reason = Some(reason);
        transition
    }

    /// A transition to [`MessageStatus::Ready`] caching the validation results.
    pub const fn ready(
        estimated_gas_limit: u64,
        compressed_transaction_size: u64,
        fee_per_gas_threshold: u64,
    ) -> Self {
        let mut transition = Self::to(MessageStatus::Ready);
        transition.estimate =
            Some((estimated_gas_limit, compressed_transaction_size, fee_per_gas_threshold));
        transition
    }

    /// A transition to [`MessageStatus::Claiming`], starting a new claim attempt at `now`.
    ///
    /// The hash of the previous attempt moves to the replaced hash, its nonce and fees are kept
    /// so that a stuck transaction can be replaced.
    pub const fn claiming(now: u64) -> Self {
        let mut transition = Self::to(MessageStatus::Claiming);
        transition.claim_attempt_started_at = Some(now);
        transition
    }

    /// A transition to [`MessageStatus::Claimed`] recording the receipt.
    pub const fn claimed(receipt: ClaimReceipt) -> Self {
        let mut transition = Self::to(MessageStatus::Claimed);
        transition.receipt = Some(receipt);
        transition
    }

    /// A transition to [`MessageStatus::ClaimFailed`], incrementing the retry count.
    pub const fn claim_failed(failure: ClaimFailure) -> Self {
        let mut transition = Self::to(MessageStatus::ClaimFailed);
        transition.claim_failure = Some(failure);
        transition.increment_retry_count = true;
        transition
    }

    /// Returns the target status.
    pub const fn status(&self) -> MessageStatus {
        self.to
    }
}

/// The [`DatabaseOperations`] trait provides methods for interacting with the message store.
#[async_trait::async_trait]
pub trait DatabaseOperations: DatabaseConnectionProvider {
    /// Insert a [`Message`] into the database if no message with the same hash exists.
    ///
    /// Returns true if the message was inserted.
    async fn insert_message(&self, message: Message) -> Result<bool, DatabaseError> {
        if !message.status.is_initial() {
            return Err(DatabaseError::InvalidInitialStatus(message.message_hash, message.status));
        }

        tracing::trace!(target: "postman::db", hash = ?message.message_hash, status = %message.status, "Inserting message into database.");
        let message: models::message::ActiveModel = message.into();
        let inserted = models::message::Entity::insert(message)
            .on_conflict(
                OnConflict::column(models::message::Column::MessageHash).do_nothing().to_owned(),
            )
            .exec_without_returning(self.get_connection())
            .await?;

        Ok(inserted == 1)
    }

    /// Get a [`Message`] from the database by its hash.
    async fn get_message(&self, message_hash: B256) -> Result<Option<Message>, DatabaseError> {
        models::message::Entity::find_by_id(message_hash.to_vec())
            .one(self.get_connection())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Get at most `limit` messages in the provided status, oldest first.
    async fn get_messages_by_status(
        &self,
        direction: Direction,
        status: MessageStatus,
        limit: u64,
    ) -> Result<Vec<Message>, DatabaseError> {
        models::message::Entity::find()
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .filter(models::message::Column::Status.eq(status.to_string()))
            .order_by_asc(models::message::Column::SentBlockNumber)
            .limit(limit)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Get at most `limit` messages in the provided status that sort after `cursor`, ordered by
    /// sent block then hash. The cursor is the `(sent_block_number, message_hash)` of the last
    /// message of the previous page, [`None`] starts from the oldest message.
    async fn get_messages_by_status_after(
        &self,
        direction: Direction,
        status: MessageStatus,
        cursor: Option<(u64, B256)>,
        limit: u64,
    ) -> Result<Vec<Message>, DatabaseError> {
        let mut query = models::message::Entity::find()
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .filter(models::message::Column::Status.eq(status.to_string()));
        if let Some((block_number, hash)) = cursor {
            let block_number = block_number as i64;
            query = query.filter(
                Condition::any()
                    .add(models::message::Column::SentBlockNumber.gt(block_number))
                    .add(
                        Condition::all()
                            .add(models::message::Column::SentBlockNumber.eq(block_number))
                            .add(models::message::Column::MessageHash.gt(hash.to_vec())),
                    ),
            );
        }
        query
            .order_by_asc(models::message::Column::SentBlockNumber)
            .order_by_asc(models::message::Column::MessageHash)
            .limit(limit)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Get at most `limit` messages in the provided status that were last updated at or before
    /// `updated_before`.
    async fn get_messages_updated_before(
        &self,
        direction: Direction,
        status: MessageStatus,
        updated_before: u64,
        limit: u64,
    ) -> Result<Vec<Message>, DatabaseError> {
        models::message::Entity::find()
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .filter(models::message::Column::Status.eq(status.to_string()))
            .filter(models::message::Column::UpdatedAt.lte(updated_before as i64))
            .order_by_asc(models::message::Column::SentBlockNumber)
            .limit(limit)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Get at most `limit` [`MessageStatus::Ready`] messages, most profitable first.
    async fn get_ready_messages(
        &self,
        direction: Direction,
        limit: u64,
    ) -> Result<Vec<Message>, DatabaseError> {
        models::message::Entity::find()
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .filter(models::message::Column::Status.eq(MessageStatus::Ready.to_string()))
            .order_by_desc(models::message::Column::FeePerGasThreshold)
            .order_by_asc(models::message::Column::SentBlockNumber)
            .limit(limit)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Get at most `limit` messages excluded for an economic reason that were last evaluated at
    /// or before `updated_before`.
    async fn get_economically_excluded_messages(
        &self,
        direction: Direction,
        updated_before: u64,
        limit: u64,
    ) -> Result<Vec<Message>, DatabaseError> {
        let reasons =
            ExclusionReason::iter().filter(ExclusionReason::is_economic).map(|r| r.to_string());
        models::message::Entity::find()
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .filter(models::message::Column::Status.eq(MessageStatus::Excluded.to_string()))
            .filter(models::message::Column::ExclusionReason.is_in(reasons))
            .filter(models::message::Column::UpdatedAt.lte(updated_before as i64))
            .order_by_asc(models::message::Column::SentBlockNumber)
            .limit(limit)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Transition the message from the `from` status using a single conditional update.
    ///
    /// Returns [`TransitionOutcome::RaceLost`] if the message was no longer in the `from` status.
    /// Transitions out of [`MessageStatus::Excluded`] only apply to economic exclusions.
    async fn transition_message(
        &self,
        message_hash: B256,
        from: MessageStatus,
        transition: MessageTransition,
    ) -> Result<TransitionOutcome, DatabaseError> {
        use models::message::Column;

        let to = transition.to;
        if !from.can_transition_to(to) {
            return Err(DatabaseError::InvalidTransition { hash: message_hash, from, to });
        }

        let mut update = models::message::Entity::update_many()
            .col_expr(Column::Status, Expr::value(to.to_string()))
            .col_expr(
                Column::ExclusionReason,
                Expr::value(transition.exclusion_reason.map(|r| r.to_string())),
            )
            .col_expr(Column::UpdatedAt, Expr::value(unix_timestamp() as i64));

        if let Some(failure) = transition.claim_failure {
            update = update.col_expr(Column::ClaimFailure, Expr::value(failure.to_string()));
        }
        if transition.increment_retry_count {
            update = update.col_expr(Column::RetryCount, Expr::col(Column::RetryCount).add(1));
        }
        if let Some(started_at) = transition.claim_attempt_started_at {
            let replaced = Func::coalesce([
                Expr::col(Column::ClaimTxHash).into(),
                Expr::col(Column::ClaimTxReplacedHash).into(),
            ]);
            update = update
                .col_expr(Column::ClaimTxReplacedHash, replaced.into())
                .col_expr(Column::ClaimTxHash, Expr::value(Option::<Vec<u8>>::None))
                .col_expr(Column::ClaimTxBroadcastedAt, Expr::value(started_at as i64));
        }
        if let Some(details) = transition.claim_transaction {
            update = set_claim_transaction(update, details);
        }
        if let Some(receipt) = transition.receipt {
            update = update
                .col_expr(Column::ClaimTxHash, Expr::value(receipt.transaction_hash.to_vec()))
                .col_expr(Column::ClaimedBlockNumber, Expr::value(receipt.block_number as i64))
                .col_expr(Column::ClaimGasUsed, Expr::value(receipt.gas_used as i64))
                .col_expr(
                    Column::ClaimEffectiveGasPrice,
                    Expr::value(encode_wei(receipt.effective_gas_price)),
                );
        }
        if let Some((gas_limit, size, threshold)) = transition.estimate {
            update = update
                .col_expr(Column::EstimatedGasLimit, Expr::value(gas_limit as i64))
                .col_expr(Column::CompressedTransactionSize, Expr::value(size as i64))
                .col_expr(
                    Column::FeePerGasThreshold,
                    Expr::value(threshold.min(i64::MAX as u64) as i64),
                );
        }

        let mut update = update
            .filter(Column::MessageHash.eq(message_hash.to_vec()))
            .filter(Column::Status.eq(from.to_string()));
        if from == MessageStatus::Excluded {
            let reasons = ExclusionReason::iter()
                .filter(ExclusionReason::is_economic)
                .map(|r| r.to_string());
            update = update.filter(Column::ExclusionReason.is_in(reasons));
        }

        let rows = update.exec(self.get_connection()).await?.rows_affected;
        if rows == 0 {
            tracing::trace!(target: "postman::db", hash = ?message_hash, %from, %to, "Lost status transition race.");
            return Ok(TransitionOutcome::RaceLost);
        }

        tracing::trace!(target: "postman::db", hash = ?message_hash, %from, %to, "Transitioned message status.");
        Ok(TransitionOutcome::Applied)
    }

    /// Record the claim transaction of a message in the [`MessageStatus::Claiming`] status.
    ///
    /// Returns false if the message is no longer claiming.
    async fn record_claim_transaction(
        &self,
        message_hash: B256,
        details: ClaimTransactionDetails,
    ) -> Result<bool, DatabaseError> {
        use models::message::Column;

        tracing::trace!(target: "postman::db", hash = ?message_hash, tx_hash = ?details.hash, nonce = details.nonce, "Recording claim transaction.");
        let update = models::message::Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(unix_timestamp() as i64));
        let rows = set_claim_transaction(update, details)
            .filter(Column::MessageHash.eq(message_hash.to_vec()))
            .filter(Column::Status.eq(MessageStatus::Claiming.to_string()))
            .exec(self.get_connection())
            .await?
            .rows_affected;

        Ok(rows == 1)
    }

    /// Returns the number of messages per status for the provided direction.
    async fn count_messages_by_status(
        &self,
        direction: Direction,
    ) -> Result<Vec<(MessageStatus, u64)>, DatabaseError> {
        let counts = models::message::Entity::find()
            .select_only()
            .column(models::message::Column::Status)
            .column_as(Expr::col(models::message::Column::MessageHash).count(), "count")
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .group_by(models::message::Column::Status)
            .into_tuple::<(String, i64)>()
            .all(self.get_connection())
            .await?;

        counts
            .into_iter()
            .map(|(status, count)| {
                let status = status
                    .parse()
                    .map_err(|_| DatabaseError::InvalidColumn { column: "status", value: status })?;
                Ok((status, count as u64))
            })
            .collect()
    }

    /// Returns the highest claim transaction nonce recorded for the provided direction.
    async fn get_last_claim_tx_nonce(
        &self,
        direction: Direction,
    ) -> Result<Option<u64>, DatabaseError> {
        Ok(models::message::Entity::find()
            .select_only()
            .column_as(Expr::col(models::message::Column::ClaimTxNonce).max(), "max_nonce")
            .filter(models::message::Column::Direction.eq(direction.to_string()))
            .into_tuple::<Option<i64>>()
            .one(self.get_connection())
            .await?
            .flatten()
            .map(|nonce| nonce as u64))
    }

    /// Returns the watermark for the provided direction and event kind.
    async fn get_watermark(
        &self,
        direction: Direction,
        kind: WatermarkKind,
    ) -> Result<Option<u64>, DatabaseError> {
        Ok(models::watermark::Entity::find_by_id(watermark_key(direction, kind))
            .one(self.get_connection())
            .await?
            .map(|model| model.block_number as u64))
    }

    /// Advance the watermark for the provided direction and event kind to `block_number`.
    ///
    /// The watermark never moves backwards, returns false if it was already at or past
    /// `block_number`.
    async fn set_watermark(
        &self,
        direction: Direction,
        kind: WatermarkKind,
        block_number: u64,
    ) -> Result<bool, DatabaseError> {
        use models::watermark::Column;

        let key = watermark_key(direction, kind);
        tracing::trace!(target: "postman::db", %key, block_number, "Advancing watermark.");

        let updated = models::watermark::Entity::update_many()
            .col_expr(Column::BlockNumber, Expr::value(block_number as i64))
            .filter(Column::Key.eq(key.as_str()))
            .filter(Column::BlockNumber.lt(block_number as i64))
            .exec(self.get_connection())
            .await?
            .rows_affected;
        if updated == 1 {
            return Ok(true);
        }

        let watermark = models::watermark::ActiveModel {
            key: ActiveValue::Set(key),
            block_number: ActiveValue::Set(block_number as i64),
        };
        let inserted = models::watermark::Entity::insert(watermark)
            .on_conflict(OnConflict::column(Column::Key).do_nothing().to_owned())
            .exec_without_returning(self.get_connection())
            .await?;

        Ok(inserted == 1)
    }

    /// Insert an [`AnchoringEvent`] if the identifier was not anchored before.
    async fn insert_anchoring(
        &self,
        direction: Direction,
        event: AnchoringEvent,
    ) -> Result<bool, DatabaseError> {
        tracing::trace!(target: "postman::db", %direction, id = %event.id, block_number = event.block_number, "Inserting anchoring into database.");
        let anchoring: models::anchoring::ActiveModel = (direction, event).into();
        let inserted = models::anchoring::Entity::insert(anchoring)
            .on_conflict(
                OnConflict::columns([
                    models::anchoring::Column::Direction,
                    models::anchoring::Column::AnchoringKey,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.get_connection())
            .await?;

        Ok(inserted == 1)
    }

    /// Returns the destination block at which the identifier was anchored, if any.
    async fn get_anchoring_block(
        &self,
        direction: Direction,
        id: AnchoringId,
    ) -> Result<Option<u64>, DatabaseError> {
        Ok(models::anchoring::Entity::find_by_id((direction.to_string(), id.key().to_vec()))
            .one(self.get_connection())
            .await?
            .map(|model| model.block_number as u64))
    }
}

impl<T> DatabaseOperations for T where T: DatabaseConnectionProvider {}

fn set_claim_transaction(
    update: sea_orm::UpdateMany<models::message::Entity>,
    details: ClaimTransactionDetails,
) -> sea_orm::UpdateMany<models::message::Entity> {
    use models::message::Column;

    update
        .col_expr(Column::ClaimTxHash, Expr::value(details.hash.map(|h| h.to_vec())))
        .col_expr(Column::ClaimTxNonce, Expr::value(details.nonce as i64))
        .col_expr(Column::ClaimTxGasLimit, Expr::value(details.gas_limit as i64))
        .col_expr(
            Column::ClaimTxMaxFeePerGas,
            Expr::value(encode_wei(details.fees.max_fee_per_gas)),
        )
        .col_expr(
            Column::ClaimTxMaxPriorityFeePerGas,
            Expr::value(encode_wei(details.fees.max_priority_fee_per_gas)),
        )
        .col_expr(Column::ClaimTxBroadcastedAt, Expr::value(details.broadcasted_at as i64))
}
