use super::m20250601_000001_create_message_table::Message;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Every loop scans messages by status for its own direction.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_direction_status")
                    .table(Message::Table)
                    .col(Message::Direction)
                    .col(Message::Status)
                    .to_owned(),
            )
            .await?;

        // The anchoring tracker matches L2 to L1 messages on their source block.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_sent_block_number")
                    .table(Message::Table)
                    .col(Message::SentBlockNumber)
                    .to_owned(),
            )
            .await?;

        // The nonce manager reads the highest persisted claim nonce on startup.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_claim_tx_nonce")
                    .table(Message::Table)
                    .col(Message::ClaimTxNonce)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_message_direction_status",
            "idx_message_sent_block_number",
            "idx_message_claim_tx_nonce",
        ] {
            manager.drop_index(Index::drop().name(name).table(Message::Table).to_owned()).await?;
        }

        Ok(())
    }
}
