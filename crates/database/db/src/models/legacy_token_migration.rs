use aggkit_primitives::LegacyTokenMigration;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a legacy token migration event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "legacy_token_migration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    block_pos: i64,
    tx_hash: Vec<u8>,
    sender: Vec<u8>,
    legacy_token_address: Vec<u8>,
    updated_token_address: Vec<u8>,
    amount: Vec<u8>,
}

/// The relation for the legacy token migration model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the legacy token migration model.
impl ActiveModelBehavior for ActiveModel {}

impl From<LegacyTokenMigration> for ActiveModel {
    fn from(value: LegacyTokenMigration) -> Self {
        Self {
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                value.block_pos.try_into().expect("block position should fit in i64"),
            ),
            tx_hash: ActiveValue::Set(value.tx_hash.to_vec()),
            sender: ActiveValue::Set(value.sender.to_vec()),
            legacy_token_address: ActiveValue::Set(value.legacy_token_address.to_vec()),
            updated_token_address: ActiveValue::Set(value.updated_token_address.to_vec()),
            amount: ActiveValue::Set(value.amount.to_be_bytes::<32>().to_vec()),
        }
    }
}

impl From<Model> for LegacyTokenMigration {
    fn from(value: Model) -> Self {
        Self {
            block_num: value.block_num as u64,
            block_pos: value.block_pos as u64,
            tx_hash: super::b256(&value.tx_hash),
            sender: super::address(&value.sender),
            legacy_token_address: super::address(&value.legacy_token_address),
            updated_token_address: super::address(&value.updated_token_address),
            amount: super::u256(&value.amount),
        }
    }
}
