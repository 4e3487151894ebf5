use aggkit_primitives::L1InfoTreeLeaf;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a leaf of the L1 info tree.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "l1info_leaf")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    position: i64,
    block_num: i64,
    block_pos: i64,
    previous_block_hash: Vec<u8>,
    timestamp: i64,
    mainnet_exit_root: Vec<u8>,
    rollup_exit_root: Vec<u8>,
    global_exit_root: Vec<u8>,
    hash: Vec<u8>,
}

/// The relation for the L1 info leaf model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the L1 info leaf model.
impl ActiveModelBehavior for ActiveModel {}

impl From<L1InfoTreeLeaf> for ActiveModel {
    fn from(leaf: L1InfoTreeLeaf) -> Self {
        let global_exit_root = leaf.global_exit_root();
        let hash = leaf.hash();
        Self {
            position: ActiveValue::Set(leaf.l1_info_tree_index as i64),
            block_num: ActiveValue::Set(
                leaf.block_number.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                leaf.block_position.try_into().expect("block position should fit in i64"),
            ),
            previous_block_hash: ActiveValue::Set(leaf.previous_block_hash.to_vec()),
            timestamp: ActiveValue::Set(
                leaf.timestamp.try_into().expect("timestamp should fit in i64"),
            ),
            mainnet_exit_root: ActiveValue::Set(leaf.mainnet_exit_root.to_vec()),
            rollup_exit_root: ActiveValue::Set(leaf.rollup_exit_root.to_vec()),
            global_exit_root: ActiveValue::Set(global_exit_root.to_vec()),
            hash: ActiveValue::Set(hash.to_vec()),
        }
    }
}

impl From<Model> for L1InfoTreeLeaf {
    fn from(value: Model) -> Self {
        Self {
            block_number: value.block_num as u64,
            block_position: value.block_pos as u64,
            l1_info_tree_index: value.position as u32,
            previous_block_hash: super::b256(&value.previous_block_hash),
            timestamp: value.timestamp as u64,
            mainnet_exit_root: super::b256(&value.mainnet_exit_root),
            rollup_exit_root: super::b256(&value.rollup_exit_root),
        }
    }
}
