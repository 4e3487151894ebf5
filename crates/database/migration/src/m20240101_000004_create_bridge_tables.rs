use sea_orm_migration::{prelude::*, schema::*};

const HASH_LENGTH: u32 = 32;
const ADDRESS_LENGTH: u32 = 20;
const AMOUNT_LENGTH: u32 = 32;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BridgeEvent::Table)
                    .if_not_exists()
                    .col(big_integer(BridgeEvent::BlockNum))
                    .col(big_integer(BridgeEvent::BlockPos))
                    .col(binary_len(BridgeEvent::TxHash, HASH_LENGTH))
                    .col(binary_len(BridgeEvent::FromAddress, ADDRESS_LENGTH))
                    .col(integer(BridgeEvent::LeafType))
                    .col(big_integer(BridgeEvent::OriginNetwork))
                    .col(binary_len(BridgeEvent::OriginAddress, ADDRESS_LENGTH))
                    .col(big_integer(BridgeEvent::DestinationNetwork))
                    .col(binary_len(BridgeEvent::DestinationAddress, ADDRESS_LENGTH))
                    .col(binary_len(BridgeEvent::Amount, AMOUNT_LENGTH))
                    .col(binary(BridgeEvent::Metadata))
                    .col(big_integer(BridgeEvent::DepositCount))
                    .col(boolean(BridgeEvent::IsNativeToken))
                    .col(binary(BridgeEvent::Calldata))
                    .col(big_integer(BridgeEvent::BlockTimestamp))
                    .primary_key(
                        Index::create().col(BridgeEvent::BlockNum).col(BridgeEvent::BlockPos),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bridge_event_deposit_count")
                    .table(BridgeEvent::Table)
                    .col(BridgeEvent::DepositCount)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(ClaimEvent::Table)
                    .if_not_exists()
                    .col(big_integer(ClaimEvent::BlockNum))
                    .col(big_integer(ClaimEvent::BlockPos))
                    .col(binary_len(ClaimEvent::TxHash, HASH_LENGTH))
                    .col(binary_len(ClaimEvent::GlobalIndex, AMOUNT_LENGTH))
                    .col(big_integer(ClaimEvent::OriginNetwork))
                    .col(binary_len(ClaimEvent::OriginAddress, ADDRESS_LENGTH))
                    .col(big_integer(ClaimEvent::DestinationNetwork))
                    .col(binary_len(ClaimEvent::DestinationAddress, ADDRESS_LENGTH))
                    .col(binary_len(ClaimEvent::Amount, AMOUNT_LENGTH))
                    .col(binary_len(ClaimEvent::MainnetExitRoot, HASH_LENGTH))
                    .col(binary_len(ClaimEvent::RollupExitRoot, HASH_LENGTH))
                    .col(binary_len(ClaimEvent::GlobalExitRoot, HASH_LENGTH))
                    .col(binary(ClaimEvent::Metadata))
                    .col(big_integer(ClaimEvent::BlockTimestamp))
                    .col(binary_null(ClaimEvent::ProofLocalExitRoot))
                    .col(binary_null(ClaimEvent::ProofRollupExitRoot))
                    .primary_key(Index::create().col(ClaimEvent::BlockNum).col(ClaimEvent::BlockPos))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(TokenMapping::Table)
                    .if_not_exists()
                    .col(big_integer(TokenMapping::BlockNum))
                    .col(big_integer(TokenMapping::BlockPos))
                    .col(binary_len(TokenMapping::TxHash, HASH_LENGTH))
                    .col(big_integer(TokenMapping::OriginNetwork))
                    .col(binary_len(TokenMapping::OriginTokenAddress, ADDRESS_LENGTH))
                    .col(binary_len(TokenMapping::WrappedTokenAddress, ADDRESS_LENGTH))
                    .col(binary(TokenMapping::Metadata))
                    .col(big_integer(TokenMapping::BlockTimestamp))
                    .primary_key(
                        Index::create().col(TokenMapping::BlockNum).col(TokenMapping::BlockPos),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(LegacyTokenMigration::Table)
                    .if_not_exists()
                    .col(big_integer(LegacyTokenMigration::BlockNum))
                    .col(big_integer(LegacyTokenMigration::BlockPos))
                    .col(binary_len(LegacyTokenMigration::TxHash, HASH_LENGTH))
                    .col(binary_len(LegacyTokenMigration::Sender, ADDRESS_LENGTH))
                    .col(binary_len(LegacyTokenMigration::LegacyTokenAddress, ADDRESS_LENGTH))
                    .col(binary_len(LegacyTokenMigration::UpdatedTokenAddress, ADDRESS_LENGTH))
                    .col(binary_len(LegacyTokenMigration::Amount, AMOUNT_LENGTH))
                    .primary_key(
                        Index::create()
                            .col(LegacyTokenMigration::BlockNum)
                            .col(LegacyTokenMigration::BlockPos),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BridgeEvent::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ClaimEvent::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(TokenMapping::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LegacyTokenMigration::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum BridgeEvent {
    Table,
    BlockNum,
    BlockPos,
    TxHash,
    FromAddress,
    LeafType,
    OriginNetwork,
    OriginAddress,
    DestinationNetwork,
    DestinationAddress,
    Amount,
    Metadata,
    DepositCount,
    IsNativeToken,
    Calldata,
    BlockTimestamp,
}

#[derive(DeriveIden)]
enum ClaimEvent {
    Table,
    BlockNum,
    BlockPos,
    TxHash,
    GlobalIndex,
    OriginNetwork,
    OriginAddress,
    DestinationNetwork,
    DestinationAddress,
    Amount,
    MainnetExitRoot,
    RollupExitRoot,
    GlobalExitRoot,
    Metadata,
    BlockTimestamp,
    ProofLocalExitRoot,
    ProofRollupExitRoot,
}

#[derive(DeriveIden)]
enum TokenMapping {
    Table,
    BlockNum,
    BlockPos,
    TxHash,
    OriginNetwork,
    OriginTokenAddress,
    WrappedTokenAddress,
    Metadata,
    BlockTimestamp,
}

#[derive(DeriveIden)]
enum LegacyTokenMigration {
    Table,
    BlockNum,
    BlockPos,
    TxHash,
    Sender,
    LegacyTokenAddress,
    UpdatedTokenAddress,
    Amount,
}
