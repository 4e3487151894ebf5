use aggkit_primitives::BlockInfo;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a processed block.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_block")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    hash: Vec<u8>,
    timestamp: i64,
}

/// The relation for the processed block model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the processed block model.
impl ActiveModelBehavior for ActiveModel {}

impl From<(BlockInfo, u64)> for ActiveModel {
    fn from((block, timestamp): (BlockInfo, u64)) -> Self {
        Self {
            block_num: ActiveValue::Set(
                block.number.try_into().expect("block number should fit in i64"),
            ),
            hash: ActiveValue::Set(block.hash.to_vec()),
            timestamp: ActiveValue::Set(
                timestamp.try_into().expect("timestamp should fit in i64"),
            ),
        }
    }
}

impl From<Model> for BlockInfo {
    fn from(value: Model) -> Self {
        Self { number: value.block_num as u64, hash: super::b256(&value.hash) }
    }
}
