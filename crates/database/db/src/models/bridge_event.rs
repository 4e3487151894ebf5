use aggkit_primitives::Bridge;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a bridge event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bridge_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    block_pos: i64,
    tx_hash: Vec<u8>,
    from_address: Vec<u8>,
    leaf_type: i32,
    origin_network: i64,
    origin_address: Vec<u8>,
    destination_network: i64,
    destination_address: Vec<u8>,
    amount: Vec<u8>,
    metadata: Vec<u8>,
    deposit_count: i64,
    is_native_token: bool,
    calldata: Vec<u8>,
    block_timestamp: i64,
}

/// The relation for the bridge event model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the bridge event model.
impl ActiveModelBehavior for ActiveModel {}

impl From<Bridge> for ActiveModel {
    fn from(value: Bridge) -> Self {
        Self {
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                value.block_pos.try_into().expect("block position should fit in i64"),
            ),
            tx_hash: ActiveValue::Set(value.tx_hash.to_vec()),
            from_address: ActiveValue::Set(value.from_address.to_vec()),
            leaf_type: ActiveValue::Set(value.leaf_type as i32),
            origin_network: ActiveValue::Set(value.origin_network as i64),
            origin_address: ActiveValue::Set(value.origin_address.to_vec()),
            destination_network: ActiveValue::Set(value.destination_network as i64),
            destination_address: ActiveValue::Set(value.destination_address.to_vec()),
            amount: ActiveValue::Set(value.amount.to_be_bytes::<32>().to_vec()),
            metadata: ActiveValue::Set(value.metadata),
            deposit_count: ActiveValue::Set(value.deposit_count as i64),
            is_native_token: ActiveValue::Set(value.is_native_token),
            calldata: ActiveValue::Set(value.calldata),
            block_timestamp: ActiveValue::Set(
                value.block_timestamp.try_into().expect("timestamp should fit in i64"),
            ),
        }
    }
}

impl From<Model> for Bridge {
    fn from(value: Model) -> Self {
        Self {
            block_num: value.block_num as u64,
            block_pos: value.block_pos as u64,
            tx_hash: super::b256(&value.tx_hash),
            from_address: super::address(&value.from_address),
            leaf_type: value.leaf_type as u8,
            origin_network: value.origin_network as u32,
            origin_address: super::address(&value.origin_address),
            destination_network: value.destination_network as u32,
            destination_address: super::address(&value.destination_address),
            amount: super::u256(&value.amount),
            metadata: value.metadata,
            deposit_count: value.deposit_count as u32,
            is_native_token: value.is_native_token,
            calldata: value.calldata,
            block_timestamp: value.block_timestamp as u64,
        }
    }
}
