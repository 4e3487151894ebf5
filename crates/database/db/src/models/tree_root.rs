use aggkit_primitives::TreeRoot;
use sea_orm::entity::prelude::*;

/// A database model that represents a versioned root of a persisted Merkle
/// tree: the root after the leaf at `leaf_index` was inserted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tree_root")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) tree: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) leaf_index: i64,
    pub(crate) hash: Vec<u8>,
    pub(crate) block_num: i64,
    pub(crate) block_position: i64,
}

/// The relation for the tree root model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the tree root model.
impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for TreeRoot {
    fn from(value: Model) -> Self {
        Self {
            hash: super::b256(&value.hash),
            index: value.leaf_index as u32,
            block_num: value.block_num as u64,
            block_position: value.block_position as u64,
        }
    }
}
