use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(binary_len(Message::MessageHash, 32).primary_key())
                    .col(string(Message::Direction))
                    .col(binary_len(Message::Sender, 20))
                    .col(binary_len(Message::Recipient, 20))
                    .col(binary_len(Message::Fee, 32))
                    .col(binary_len(Message::Value, 32))
                    .col(binary_len(Message::MessageNonce, 32))
                    .col(blob(Message::Calldata))
                    .col(big_integer(Message::SentBlockNumber))
                    .col(binary_len(Message::SentTransactionHash, 32))
                    .col(string(Message::Status))
                    .col(string_null(Message::ExclusionReason))
                    .col(string_null(Message::ClaimFailure))
                    .col(integer(Message::RetryCount).default(0))
                    .col(binary_len_null(Message::ClaimTxHash, 32))
                    .col(binary_len_null(Message::ClaimTxReplacedHash, 32))
                    .col(big_integer_null(Message::ClaimTxNonce))
                    .col(big_integer_null(Message::ClaimTxGasLimit))
                    .col(binary_len_null(Message::ClaimTxMaxFeePerGas, 32))
                    .col(binary_len_null(Message::ClaimTxMaxPriorityFeePerGas, 32))
                    .col(big_integer_null(Message::ClaimTxBroadcastedAt))
                    .col(big_integer_null(Message::ClaimedBlockNumber))
                    .col(big_integer_null(Message::ClaimGasUsed))
                    .col(binary_len_null(Message::ClaimEffectiveGasPrice, 32))
                    .col(big_integer_null(Message::EstimatedGasLimit))
                    .col(big_integer_null(Message::CompressedTransactionSize))
                    .col(big_integer_null(Message::FeePerGasThreshold))
                    .col(big_integer(Message::CreatedAt))
                    .col(big_integer(Message::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Message {
    Table,
    MessageHash,
    Direction,
    Sender,
    Recipient,
    Fee,
    Value,
    MessageNonce,
    Calldata,
    SentBlockNumber,
    SentTransactionHash,
    Status,
    ExclusionReason,
    ClaimFailure,
    RetryCount,
    ClaimTxHash,
    ClaimTxReplacedHash,
    ClaimTxNonce,
    ClaimTxGasLimit,
    ClaimTxMaxFeePerGas,
    ClaimTxMaxPriorityFeePerGas,
    ClaimTxBroadcastedAt,
    ClaimedBlockNumber,
    ClaimGasUsed,
    ClaimEffectiveGasPrice,
    EstimatedGasLimit,
    CompressedTransactionSize,
    FeePerGasThreshold,
    CreatedAt,
    UpdatedAt,
}
