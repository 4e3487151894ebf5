use sea_orm::{entity::prelude::*, ActiveValue};

/// A verify-batches event recorded by the L1 info tree syncer. The
/// `rollup_exit_root` column is the root of the local rollup exit tree after
/// the event was applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyBatches {
    /// The block the event was emitted at.
    pub block_num: u64,
    /// The position of the log inside the block.
    pub block_pos: u64,
    /// The id of the verified rollup.
    pub rollup_id: u32,
    /// The last batch number verified.
    pub num_batch: u64,
    /// The state root of the verified batch.
    pub state_root: alloy_primitives::B256,
    /// The local exit root of the verified rollup.
    pub exit_root: alloy_primitives::B256,
    /// The aggregator that submitted the proof.
    pub aggregator: alloy_primitives::Address,
    /// The rollup exit tree root after applying the event.
    pub rollup_exit_root: alloy_primitives::B256,
}

/// A database model that represents a verify-batches event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verify_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    block_pos: i64,
    rollup_id: i64,
    num_batch: i64,
    state_root: Vec<u8>,
    exit_root: Vec<u8>,
    aggregator: Vec<u8>,
    rollup_exit_root: Vec<u8>,
}

/// The relation for the verify-batches model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the verify-batches model.
impl ActiveModelBehavior for ActiveModel {}

impl From<VerifyBatches> for ActiveModel {
    fn from(value: VerifyBatches) -> Self {
        Self {
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                value.block_pos.try_into().expect("block position should fit in i64"),
            ),
            rollup_id: ActiveValue::Set(value.rollup_id as i64),
            num_batch: ActiveValue::Set(
                value.num_batch.try_into().expect("batch number should fit in i64"),
            ),
            state_root: ActiveValue::Set(value.state_root.to_vec()),
            exit_root: ActiveValue::Set(value.exit_root.to_vec()),
            aggregator: ActiveValue::Set(value.aggregator.to_vec()),
            rollup_exit_root: ActiveValue::Set(value.rollup_exit_root.to_vec()),
        }
    }
}

impl From<Model> for VerifyBatches {
    fn from(value: Model) -> Self {
        Self {
            block_num: value.block_num as u64,
            block_pos: value.block_pos as u64,
            rollup_id: value.rollup_id as u32,
            num_batch: value.num_batch as u64,
            state_root: super::b256(&value.state_root),
            exit_root: super::b256(&value.exit_root),
            aggregator: super::address(&value.aggregator),
            rollup_exit_root: super::b256(&value.rollup_exit_root),
        }
    }
}
