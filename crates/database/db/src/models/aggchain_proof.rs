use crate::operations::StoredAggchainProof;

use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that caches the aggchain proof generated for a
/// certificate, so an `InError` retry does not have to query the prover again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "aggchain_proof")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    height: i64,
    proof: Vec<u8>,
    version: String,
    vkey: Vec<u8>,
    aggchain_params: Vec<u8>,
    /// JSON-encoded proof context map.
    context: String,
    last_proven_block: i64,
    end_block: i64,
    local_exit_root: Vec<u8>,
    custom_chain_data: Vec<u8>,
}

/// The relation for the aggchain proof model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the aggchain proof model.
impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(u64, StoredAggchainProof)> for ActiveModel {
    type Error = serde_json::Error;

    fn try_from((height, value): (u64, StoredAggchainProof)) -> Result<Self, Self::Error> {
        Ok(Self {
            height: ActiveValue::Set(height.try_into().expect("height should fit in i64")),
            proof: ActiveValue::Set(value.proof),
            version: ActiveValue::Set(value.version),
            vkey: ActiveValue::Set(value.vkey),
            aggchain_params: ActiveValue::Set(value.aggchain_params.to_vec()),
            context: ActiveValue::Set(serde_json::to_string(&value.context)?),
            last_proven_block: ActiveValue::Set(
                value.last_proven_block.try_into().expect("block number should fit in i64"),
            ),
            end_block: ActiveValue::Set(
                value.end_block.try_into().expect("block number should fit in i64"),
            ),
            local_exit_root: ActiveValue::Set(value.local_exit_root.to_vec()),
            custom_chain_data: ActiveValue::Set(value.custom_chain_data),
        })
    }
}

impl TryFrom<Model> for StoredAggchainProof {
    type Error = serde_json::Error;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            proof: value.proof,
            version: value.version,
            vkey: value.vkey,
            aggchain_params: super::b256(&value.aggchain_params),
            context: serde_json::from_str(&value.context)?,
            last_proven_block: value.last_proven_block as u64,
            end_block: value.end_block as u64,
            local_exit_root: super::b256(&value.local_exit_root),
            custom_chain_data: value.custom_chain_data,
        })
    }
}
