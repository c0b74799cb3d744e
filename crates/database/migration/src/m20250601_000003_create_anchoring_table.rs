use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Anchoring::Table)
                    .if_not_exists()
                    .col(string(Anchoring::Direction))
                    .col(binary_len(Anchoring::AnchoringKey, 32))
                    .col(big_integer(Anchoring::BlockNumber))
                    .primary_key(
                        Index::create().col(Anchoring::Direction).col(Anchoring::AnchoringKey),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Anchoring::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Anchoring {
    Table,
    Direction,
    AnchoringKey,
    BlockNumber,
}
