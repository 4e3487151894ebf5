use aggkit_primitives::TokenMapping;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a token mapping event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "token_mapping")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    block_pos: i64,
    tx_hash: Vec<u8>,
    origin_network: i64,
    origin_token_address: Vec<u8>,
    wrapped_token_address: Vec<u8>,
    metadata: Vec<u8>,
    block_timestamp: i64,
}

/// The relation for the token mapping model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the token mapping model.
impl ActiveModelBehavior for ActiveModel {}

impl From<TokenMapping> for ActiveModel {
    fn from(value: TokenMapping) -> Self {
        Self {
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                value.block_pos.try_into().expect("block position should fit in i64"),
            ),
            tx_hash: ActiveValue::Set(value.tx_hash.to_vec()),
            origin_network: ActiveValue::Set(value.origin_network as i64),
            origin_token_address: ActiveValue::Set(value.origin_token_address.to_vec()),
            wrapped_token_address: ActiveValue::Set(value.wrapped_token_address.to_vec()),
            metadata: ActiveValue::Set(value.metadata),
            block_timestamp: ActiveValue::Set(
                value.block_timestamp.try_into().expect("timestamp should fit in i64"),
            ),
        }
    }
}

impl From<Model> for TokenMapping {
    fn from(value: Model) -> Self {
        Self {
            block_num: value.block_num as u64,
            block_pos: value.block_pos as u64,
            tx_hash: super::b256(&value.tx_hash),
            origin_network: value.origin_network as u32,
            origin_token_address: super::address(&value.origin_token_address),
            wrapped_token_address: super::address(&value.wrapped_token_address),
            metadata: value.metadata,
            block_timestamp: value.block_timestamp as u64,
        }
    }
}
