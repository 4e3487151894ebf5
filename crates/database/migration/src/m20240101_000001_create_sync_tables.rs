use sea_orm_migration::{prelude::*, schema::*};

const HASH_LENGTH: u32 = 32;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncBlock::Table)
                    .if_not_exists()
                    .col(big_integer(SyncBlock::BlockNum).primary_key())
                    .col(binary_len(SyncBlock::Hash, HASH_LENGTH))
                    .col(big_integer(SyncBlock::Timestamp))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(RuntimeData::Table)
                    .if_not_exists()
                    .col(integer(RuntimeData::Id).primary_key())
                    .col(big_integer(RuntimeData::ChainId))
                    .col(text(RuntimeData::Addresses))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SyncBlock::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(RuntimeData::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SyncBlock {
    Table,
    BlockNum,
    Hash,
    Timestamp,
}

#[derive(DeriveIden)]
enum RuntimeData {
    Table,
    Id,
    ChainId,
    Addresses,
}
