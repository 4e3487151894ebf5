use sea_orm::{entity::prelude::*, ActiveValue};

/// The initial L1 info root snapshot emitted by `InitL1InfoRootMap`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InitL1InfoRootMap {
    /// The leaf count the snapshot was taken at.
    pub leaf_count: u32,
    /// The L1 info root at the snapshot.
    pub current_l1_info_root: alloy_primitives::B256,
    /// The block the event was emitted at.
    pub block_num: u64,
}

/// A database model that represents the initial L1 info root snapshot.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "init_root_map")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    leaf_count: i64,
    root: Vec<u8>,
    block_num: i64,
}

/// The relation for the init root map model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the init root map model.
impl ActiveModelBehavior for ActiveModel {}

impl From<InitL1InfoRootMap> for ActiveModel {
    fn from(value: InitL1InfoRootMap) -> Self {
        Self {
            leaf_count: ActiveValue::Set(value.leaf_count as i64),
            root: ActiveValue::Set(value.current_l1_info_root.to_vec()),
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
        }
    }
}

impl From<Model> for InitL1InfoRootMap {
    fn from(value: Model) -> Self {
        Self {
            leaf_count: value.leaf_count as u32,
            current_l1_info_root: super::b256(&value.root),
            block_num: value.block_num as u64,
        }
    }
}
