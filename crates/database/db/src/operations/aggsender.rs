use crate::{models, DatabaseConnectionProvider, DatabaseError};

use aggkit_agglayer::{CertificateStatus, CertificateType};
use alloy_primitives::B256;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::BTreeMap;

/// The locally stored header of a submitted certificate. One row exists per
/// height; only the aggsender scheduler mutates it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// The id of the network the certificate proves.
    pub network_id: u32,
    /// The height of the certificate.
    pub height: u64,
    /// The certificate id assigned by the agglayer.
    pub certificate_id: B256,
    /// The last observed remote status.
    pub status: CertificateStatus,
    /// The local exit root before the certified range.
    pub prev_local_exit_root: Option<B256>,
    /// The local exit root after the certified range.
    pub new_local_exit_root: B256,
    /// The certificate metadata.
    pub metadata: B256,
    /// The epoch the certificate settled in, when known.
    pub epoch: Option<u64>,
    /// The index of the certificate inside its epoch, when known.
    pub certificate_index: Option<u64>,
    /// The first L2 block of the certified range.
    pub from_block: u64,
    /// The last L2 block of the certified range.
    pub to_block: u64,
    /// Unix timestamp of the first submission. Retries keep it unchanged.
    pub created_at: u64,
    /// The number of times this certificate has been retried.
    pub retry_count: u32,
    /// The type of aggchain data the certificate carries.
    pub cert_type: CertificateType,
    /// The finalized L1 info tree root the claims were proven against.
    pub finalized_l1_info_tree_root: Option<B256>,
    /// The leaf count of the finalized L1 info tree root.
    pub l1_info_tree_leaf_count: u32,
    /// The hash of the settlement transaction, when settled.
    pub settlement_tx_hash: Option<B256>,
}

impl CertificateInfo {
    /// Returns a short identifier of the certificate for logging.
    pub fn id(&self) -> String {
        format!("{}/{}", self.height, self.certificate_id)
    }
}

/// The cached aggchain proof of a certificate awaiting settlement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredAggchainProof {
    /// The SP1 stark proof bytes.
    pub proof: Vec<u8>,
    /// The prover version that produced the proof.
    pub version: String,
    /// The verification key of the proof.
    pub vkey: Vec<u8>,
    /// The aggchain params committed by the proof.
    pub aggchain_params: B256,
    /// The proof context map.
    pub context: BTreeMap<String, Vec<u8>>,
    /// The block the proof starts after.
    pub last_proven_block: u64,
    /// The last block covered by the proof.
    pub end_block: u64,
    /// The local exit root computed by the prover.
    pub local_exit_root: B256,
    /// Opaque chain-specific data returned by the prover.
    pub custom_chain_data: Vec<u8>,
}

/// Operations on the certificate tables owned by the aggsender.
#[async_trait::async_trait]
pub trait AggsenderOperations: DatabaseConnectionProvider {
    /// Inserts or replaces the certificate header at its height.
    async fn save_certificate_header(&self, info: CertificateInfo) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", id = info.id(), status = %info.status, "saving certificate header");
        let model: models::certificate_info::ActiveModel = info.into();
        models::certificate_info::Entity::insert(model)
            .on_conflict(
                OnConflict::column(models::certificate_info::Column::Height)
                    .update_columns(vec![
                        models::certificate_info::Column::CertificateId,
                        models::certificate_info::Column::Status,
                        models::certificate_info::Column::PrevLocalExitRoot,
                        models::certificate_info::Column::NewLocalExitRoot,
                        models::certificate_info::Column::Metadata,
                        models::certificate_info::Column::Epoch,
                        models::certificate_info::Column::CertificateIndex,
                        models::certificate_info::Column::FromBlock,
                        models::certificate_info::Column::ToBlock,
                        models::certificate_info::Column::CreatedAt,
                        models::certificate_info::Column::RetryCount,
                        models::certificate_info::Column::CertType,
                        models::certificate_info::Column::FinalizedL1InfoTreeRoot,
                        models::certificate_info::Column::L1InfoTreeLeafCount,
                        models::certificate_info::Column::SettlementTxHash,
                    ])
                    .to_owned(),
            )
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Updates the status (and settlement transaction hash, when known) of
    /// the certificate at the given height.
    async fn update_certificate_status(
        &self,
        height: u64,
        status: CertificateStatus,
        settlement_tx_hash: Option<B256>,
    ) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", height, %status, "updating certificate status");
        let mut update = models::certificate_info::Entity::update_many()
            .filter(models::certificate_info::Column::Height.eq(height as i64))
            .col_expr(
                models::certificate_info::Column::Status,
                Expr::value(status.to_string()),
            );
        if let Some(hash) = settlement_tx_hash {
            update = update.col_expr(
                models::certificate_info::Column::SettlementTxHash,
                Expr::value(Some(hash.to_vec())),
            );
        }
        update.exec(self.get_connection()).await?;
        Ok(())
    }

    /// Returns the certificate header at the given height.
    async fn get_certificate_by_height(
        &self,
        height: u64,
    ) -> Result<Option<CertificateInfo>, DatabaseError> {
        models::certificate_info::Entity::find_by_id(height as i64)
            .one(self.get_connection())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Returns the header of the certificate with the greatest height.
    async fn get_last_sent_certificate_header(
        &self,
    ) -> Result<Option<CertificateInfo>, DatabaseError> {
        models::certificate_info::Entity::find()
            .order_by_desc(models::certificate_info::Column::Height)
            .one(self.get_connection())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Caches the aggchain proof for the certificate at the given height.
    async fn save_aggchain_proof(
        &self,
        height: u64,
        proof: StoredAggchainProof,
    ) -> Result<(), DatabaseError> {
        let model: models::aggchain_proof::ActiveModel = (height, proof).try_into()?;
        models::aggchain_proof::Entity::insert(model)
            .on_conflict(
                OnConflict::column(models::aggchain_proof::Column::Height)
                    .update_columns(vec![
                        models::aggchain_proof::Column::Proof,
                        models::aggchain_proof::Column::Version,
                        models::aggchain_proof::Column::Vkey,
                        models::aggchain_proof::Column::AggchainParams,
                        models::aggchain_proof::Column::Context,
                        models::aggchain_proof::Column::LastProvenBlock,
                        models::aggchain_proof::Column::EndBlock,
                        models::aggchain_proof::Column::LocalExitRoot,
                        models::aggchain_proof::Column::CustomChainData,
                    ])
                    .to_owned(),
            )
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the cached aggchain proof for the given height.
    async fn get_aggchain_proof(
        &self,
        height: u64,
    ) -> Result<Option<StoredAggchainProof>, DatabaseError> {
        models::aggchain_proof::Entity::find_by_id(height as i64)
            .one(self.get_connection())
            .await?
            .map(|model| Ok(model.try_into()?))
            .transpose()
    }

    /// Drops the cached aggchain proof for the given height.
    async fn delete_aggchain_proof(&self, height: u64) -> Result<(), DatabaseError> {
        models::aggchain_proof::Entity::delete_by_id(height as i64)
            .exec(self.get_connection())
            .await?;
        Ok(())
    }
}

impl<T: DatabaseConnectionProvider> AggsenderOperations for T {}
