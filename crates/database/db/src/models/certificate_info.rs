use crate::operations::CertificateInfo;

use sea_orm::{entity::prelude::*, ActiveValue};
use std::str::FromStr;

/// A database model that represents a submitted certificate header.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "certificate_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    height: i64,
    network_id: i64,
    certificate_id: Vec<u8>,
    status: String,
    prev_local_exit_root: Option<Vec<u8>>,
    new_local_exit_root: Vec<u8>,
    metadata: Vec<u8>,
    epoch: Option<i64>,
    certificate_index: Option<i64>,
    from_block: i64,
    to_block: i64,
    created_at: i64,
    retry_count: i32,
    cert_type: String,
    finalized_l1_info_tree_root: Option<Vec<u8>>,
    l1_info_tree_leaf_count: i64,
    settlement_tx_hash: Option<Vec<u8>>,
}

/// The relation for the certificate info model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the certificate info model.
impl ActiveModelBehavior for ActiveModel {}

impl From<CertificateInfo> for ActiveModel {
    fn from(value: CertificateInfo) -> Self {
        Self {
            height: ActiveValue::Set(
                value.height.try_into().expect("height should fit in i64"),
            ),
            network_id: ActiveValue::Set(value.network_id as i64),
            certificate_id: ActiveValue::Set(value.certificate_id.to_vec()),
            status: ActiveValue::Set(value.status.to_string()),
            prev_local_exit_root: ActiveValue::Set(
                value.prev_local_exit_root.map(|root| root.to_vec()),
            ),
            new_local_exit_root: ActiveValue::Set(value.new_local_exit_root.to_vec()),
            metadata: ActiveValue::Set(value.metadata.to_vec()),
            epoch: ActiveValue::Set(value.epoch.map(|epoch| epoch as i64)),
            certificate_index: ActiveValue::Set(value.certificate_index.map(|idx| idx as i64)),
            from_block: ActiveValue::Set(
                value.from_block.try_into().expect("block number should fit in i64"),
            ),
            to_block: ActiveValue::Set(
                value.to_block.try_into().expect("block number should fit in i64"),
            ),
            created_at: ActiveValue::Set(
                value.created_at.try_into().expect("timestamp should fit in i64"),
            ),
            retry_count: ActiveValue::Set(value.retry_count as i32),
            cert_type: ActiveValue::Set(value.cert_type.to_string()),
            finalized_l1_info_tree_root: ActiveValue::Set(
                value.finalized_l1_info_tree_root.map(|root| root.to_vec()),
            ),
            l1_info_tree_leaf_count: ActiveValue::Set(value.l1_info_tree_leaf_count as i64),
            settlement_tx_hash: ActiveValue::Set(
                value.settlement_tx_hash.map(|hash| hash.to_vec()),
            ),
        }
    }
}

impl TryFrom<Model> for CertificateInfo {
    type Error = crate::DatabaseError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        let status = aggkit_agglayer::CertificateStatus::from_str(&value.status)
            .map_err(|_| crate::DatabaseError::UnknownCertificateStatus(value.status.clone()))?;
        let cert_type = aggkit_agglayer::CertificateType::from_str(&value.cert_type)
            .map_err(|_| crate::DatabaseError::UnknownCertificateType(value.cert_type.clone()))?;
        Ok(Self {
            height: value.height as u64,
            network_id: value.network_id as u32,
            certificate_id: super::b256(&value.certificate_id),
            status,
            prev_local_exit_root: value.prev_local_exit_root.as_deref().map(super::b256),
            new_local_exit_root: super::b256(&value.new_local_exit_root),
            metadata: super::b256(&value.metadata),
            epoch: value.epoch.map(|epoch| epoch as u64),
            certificate_index: value.certificate_index.map(|idx| idx as u64),
            from_block: value.from_block as u64,
            to_block: value.to_block as u64,
            created_at: value.created_at as u64,
            retry_count: value.retry_count as u32,
            cert_type,
            finalized_l1_info_tree_root: value
                .finalized_l1_info_tree_root
                .as_deref()
                .map(super::b256),
            l1_info_tree_leaf_count: value.l1_info_tree_leaf_count as u32,
            settlement_tx_hash: value.settlement_tx_hash.as_deref().map(super::b256),
        })
    }
}
