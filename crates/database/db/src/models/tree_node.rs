use sea_orm::entity::prelude::*;

/// A database model that represents an internal node of a persisted Merkle
/// tree, keyed by its hash. Nodes are content-addressed and shared between
/// historical roots, so a reorg never deletes them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tree_node")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) tree: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub(crate) hash: Vec<u8>,
    pub(crate) left: Vec<u8>,
    pub(crate) right: Vec<u8>,
}

/// The relation for the tree node model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the tree node model.
impl ActiveModelBehavior for ActiveModel {}
