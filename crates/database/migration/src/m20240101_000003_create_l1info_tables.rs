use sea_orm_migration::{prelude::*, schema::*};

const HASH_LENGTH: u32 = 32;
const ADDRESS_LENGTH: u32 = 20;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(L1InfoLeaf::Table)
                    .if_not_exists()
                    .col(big_integer(L1InfoLeaf::Position).primary_key())
                    .col(big_integer(L1InfoLeaf::BlockNum))
                    .col(big_integer(L1InfoLeaf::BlockPos))
                    .col(binary_len(L1InfoLeaf::PreviousBlockHash, HASH_LENGTH))
                    .col(big_integer(L1InfoLeaf::Timestamp))
                    .col(binary_len(L1InfoLeaf::MainnetExitRoot, HASH_LENGTH))
                    .col(binary_len(L1InfoLeaf::RollupExitRoot, HASH_LENGTH))
                    .col(binary_len(L1InfoLeaf::GlobalExitRoot, HASH_LENGTH))
                    .col(binary_len(L1InfoLeaf::Hash, HASH_LENGTH))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_l1info_leaf_ger")
                    .table(L1InfoLeaf::Table)
                    .col(L1InfoLeaf::GlobalExitRoot)
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(VerifyBatches::Table)
                    .if_not_exists()
                    .col(big_integer(VerifyBatches::BlockNum))
                    .col(big_integer(VerifyBatches::BlockPos))
                    .col(big_integer(VerifyBatches::RollupId))
                    .col(big_integer(VerifyBatches::NumBatch))
                    .col(binary_len(VerifyBatches::StateRoot, HASH_LENGTH))
                    .col(binary_len(VerifyBatches::ExitRoot, HASH_LENGTH))
                    .col(binary_len(VerifyBatches::Aggregator, ADDRESS_LENGTH))
                    .col(binary_len(VerifyBatches::RollupExitRoot, HASH_LENGTH))
                    .primary_key(
                        Index::create().col(VerifyBatches::BlockNum).col(VerifyBatches::BlockPos),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(InitRootMap::Table)
                    .if_not_exists()
                    .col(big_integer(InitRootMap::LeafCount).primary_key())
                    .col(binary_len(InitRootMap::Root, HASH_LENGTH))
                    .col(big_integer(InitRootMap::BlockNum))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(L1InfoLeaf::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(VerifyBatches::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(InitRootMap::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum L1InfoLeaf {
    #[sea_orm(iden = "l1info_leaf")]
    Table,
    Position,
    BlockNum,
    BlockPos,
    PreviousBlockHash,
    Timestamp,
    MainnetExitRoot,
    RollupExitRoot,
    GlobalExitRoot,
    Hash,
}

#[derive(DeriveIden)]
enum VerifyBatches {
    Table,
    BlockNum,
    BlockPos,
    RollupId,
    NumBatch,
    StateRoot,
    ExitRoot,
    Aggregator,
    RollupExitRoot,
}

#[derive(DeriveIden)]
enum InitRootMap {
    Table,
    LeafCount,
    Root,
    BlockNum,
}
