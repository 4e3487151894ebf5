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
                    .table(CertificateInfo::Table)
                    .if_not_exists()
                    .col(big_integer(CertificateInfo::Height).primary_key())
                    .col(big_integer(CertificateInfo::NetworkId))
                    .col(binary_len(CertificateInfo::CertificateId, HASH_LENGTH))
                    .col(string(CertificateInfo::Status))
                    .col(binary_len_null(CertificateInfo::PrevLocalExitRoot, HASH_LENGTH))
                    .col(binary_len(CertificateInfo::NewLocalExitRoot, HASH_LENGTH))
                    .col(binary_len(CertificateInfo::Metadata, HASH_LENGTH))
                    .col(big_integer_null(CertificateInfo::Epoch))
                    .col(big_integer_null(CertificateInfo::CertificateIndex))
                    .col(big_integer(CertificateInfo::FromBlock))
                    .col(big_integer(CertificateInfo::ToBlock))
                    .col(big_integer(CertificateInfo::CreatedAt))
                    .col(integer(CertificateInfo::RetryCount))
                    .col(string(CertificateInfo::CertType))
                    .col(binary_len_null(CertificateInfo::FinalizedL1InfoTreeRoot, HASH_LENGTH))
                    .col(big_integer(CertificateInfo::L1InfoTreeLeafCount))
                    .col(binary_len_null(CertificateInfo::SettlementTxHash, HASH_LENGTH))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(AggchainProof::Table)
                    .if_not_exists()
                    .col(big_integer(AggchainProof::Height).primary_key())
                    .col(binary(AggchainProof::Proof))
                    .col(string(AggchainProof::Version))
                    .col(binary(AggchainProof::Vkey))
                    .col(binary_len(AggchainProof::AggchainParams, HASH_LENGTH))
                    .col(text(AggchainProof::Context))
                    .col(big_integer(AggchainProof::LastProvenBlock))
                    .col(big_integer(AggchainProof::EndBlock))
                    .col(binary_len(AggchainProof::LocalExitRoot, HASH_LENGTH))
                    .col(binary(AggchainProof::CustomChainData))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CertificateInfo::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(AggchainProof::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CertificateInfo {
    Table,
    Height,
    NetworkId,
    CertificateId,
    Status,
    PrevLocalExitRoot,
    NewLocalExitRoot,
    Metadata,
    Epoch,
    CertificateIndex,
    FromBlock,
    ToBlock,
    CreatedAt,
    RetryCount,
    CertType,
    FinalizedL1InfoTreeRoot,
    L1InfoTreeLeafCount,
    SettlementTxHash,
}

#[derive(DeriveIden)]
enum AggchainProof {
    Table,
    Height,
    Proof,
    Version,
    Vkey,
    AggchainParams,
    Context,
    LastProvenBlock,
    EndBlock,
    LocalExitRoot,
    CustomChainData,
}
