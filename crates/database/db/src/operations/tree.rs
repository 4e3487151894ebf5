use crate::{models, DatabaseConnectionProvider, DatabaseError};

use aggkit_primitives::TreeRoot;
use alloy_primitives::B256;
use sea_orm::{ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::fmt;

/// Discriminates the Merkle trees sharing the node and root tables of a
/// syncer database.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TreeTag {
    /// The L1 info tree.
    L1Info,
    /// The rollup exit tree.
    RollupExit,
    /// The local exit tree of a bridge.
    LocalExit,
}

impl TreeTag {
    /// The string tag persisted in the tree tables.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::L1Info => "l1_info",
            Self::RollupExit => "rollup_exit",
            Self::LocalExit => "local_exit",
        }
    }
}

impl fmt::Display for TreeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations on the persisted Merkle tree tables.
#[async_trait::async_trait]
pub trait TreeOperations: DatabaseConnectionProvider {
    /// Inserts an internal tree node. Nodes are content-addressed so
    /// re-inserting an existing hash is a no-op.
    async fn insert_tree_node(
        &self,
        tree: TreeTag,
        hash: B256,
        left: B256,
        right: B256,
    ) -> Result<(), DatabaseError> {
        let model = models::tree_node::ActiveModel {
            tree: ActiveValue::Set(tree.as_str().to_owned()),
            hash: ActiveValue::Set(hash.to_vec()),
            left: ActiveValue::Set(left.to_vec()),
            right: ActiveValue::Set(right.to_vec()),
        };
        let result = models::tree_node::Entity::insert(model)
            .on_conflict_do_nothing()
            .exec(self.get_connection())
            .await;
        if matches!(result, Err(sea_orm::DbErr::RecordNotInserted)) {
            return Ok(());
        }
        result.map(|_| ())?;
        Ok(())
    }

    /// Returns the children of the node with the given hash.
    async fn get_tree_node(
        &self,
        tree: TreeTag,
        hash: B256,
    ) -> Result<Option<(B256, B256)>, DatabaseError> {
        Ok(models::tree_node::Entity::find()
            .filter(models::tree_node::Column::Tree.eq(tree.as_str()))
            .filter(models::tree_node::Column::Hash.eq(hash.to_vec()))
            .one(self.get_connection())
            .await?
            .map(|model| (models::b256(&model.left), models::b256(&model.right))))
    }

    /// Inserts a versioned root.
    async fn insert_tree_root(&self, tree: TreeTag, root: TreeRoot) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", %tree, index = root.index, hash = ?root.hash, "inserting tree root");
        let model = models::tree_root::ActiveModel {
            tree: ActiveValue::Set(tree.as_str().to_owned()),
            leaf_index: ActiveValue::Set(root.index as i64),
            hash: ActiveValue::Set(root.hash.to_vec()),
            block_num: ActiveValue::Set(
                root.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_position: ActiveValue::Set(
                root.block_position.try_into().expect("block position should fit in i64"),
            ),
        };
        models::tree_root::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the root recorded after the leaf at `leaf_index` was inserted.
    async fn get_tree_root_by_index(
        &self,
        tree: TreeTag,
        leaf_index: u32,
    ) -> Result<Option<TreeRoot>, DatabaseError> {
        Ok(models::tree_root::Entity::find()
            .filter(models::tree_root::Column::Tree.eq(tree.as_str()))
            .filter(models::tree_root::Column::LeafIndex.eq(leaf_index as i64))
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the root with the given hash.
    async fn get_tree_root_by_hash(
        &self,
        tree: TreeTag,
        hash: B256,
    ) -> Result<Option<TreeRoot>, DatabaseError> {
        Ok(models::tree_root::Entity::find()
            .filter(models::tree_root::Column::Tree.eq(tree.as_str()))
            .filter(models::tree_root::Column::Hash.eq(hash.to_vec()))
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the most recent root of the tree.
    async fn get_last_tree_root(&self, tree: TreeTag) -> Result<Option<TreeRoot>, DatabaseError> {
        Ok(models::tree_root::Entity::find()
            .filter(models::tree_root::Column::Tree.eq(tree.as_str()))
            .order_by_desc(models::tree_root::Column::LeafIndex)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Deletes every root inserted at or after the provided block, returning
    /// the number of deleted rows. Content-addressed nodes are kept.
    async fn delete_tree_roots_gte_block(
        &self,
        tree: TreeTag,
        block_num: u64,
    ) -> Result<u64, DatabaseError> {
        tracing::trace!(target: "aggkit::db", %tree, block_num, "deleting tree roots from block number");
        Ok(models::tree_root::Entity::delete_many()
            .filter(models::tree_root::Column::Tree.eq(tree.as_str()))
            .filter(models::tree_root::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await
            .map(|res| res.rows_affected)?)
    }
}

impl<T: DatabaseConnectionProvider> TreeOperations for T {}
