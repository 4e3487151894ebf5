use crate::{
    models,
    models::{init_root_map::InitL1InfoRootMap, verify_batches::VerifyBatches},
    DatabaseConnectionProvider, DatabaseError,
};

use aggkit_primitives::L1InfoTreeLeaf;
use alloy_primitives::B256;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

/// Operations on the tables owned by the L1 info tree syncer.
#[async_trait::async_trait]
pub trait L1InfoTreeOperations: DatabaseConnectionProvider {
    /// Inserts an L1 info tree leaf.
    async fn insert_l1info_leaf(&self, leaf: L1InfoTreeLeaf) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", index = leaf.l1_info_tree_index, block = leaf.block_number, "inserting l1 info leaf");
        let model: models::l1info_leaf::ActiveModel = leaf.into();
        models::l1info_leaf::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the leaf at the given tree index.
    async fn get_l1info_leaf_by_index(
        &self,
        index: u32,
    ) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find_by_id(index as i64)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the leaf committing the given global exit root.
    async fn get_l1info_leaf_by_ger(
        &self,
        global_exit_root: B256,
    ) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .filter(models::l1info_leaf::Column::GlobalExitRoot.eq(global_exit_root.to_vec()))
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the most recent leaf inserted at or before `block_num`.
    async fn get_latest_l1info_until_block(
        &self,
        block_num: u64,
    ) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .filter(models::l1info_leaf::Column::BlockNum.lte(block_num as i64))
            .order_by_desc(models::l1info_leaf::Column::Position)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the first inserted leaf carrying the given rollup exit root.
    async fn get_first_l1info_with_rollup_exit_root(
        &self,
        rollup_exit_root: B256,
    ) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .filter(models::l1info_leaf::Column::RollupExitRoot.eq(rollup_exit_root.to_vec()))
            .order_by_asc(models::l1info_leaf::Column::Position)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the most recent leaf.
    async fn get_last_l1info_leaf(&self) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .order_by_desc(models::l1info_leaf::Column::Position)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the first leaf.
    async fn get_first_l1info_leaf(&self) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .order_by_asc(models::l1info_leaf::Column::Position)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the first leaf inserted at or after `block_num`.
    async fn get_first_l1info_after_block(
        &self,
        block_num: u64,
    ) -> Result<Option<L1InfoTreeLeaf>, DatabaseError> {
        Ok(models::l1info_leaf::Entity::find()
            .filter(models::l1info_leaf::Column::BlockNum.gte(block_num as i64))
            .order_by_asc(models::l1info_leaf::Column::Position)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Deletes every leaf inserted at or after the provided block.
    async fn delete_l1info_leaves_gte(&self, block_num: u64) -> Result<u64, DatabaseError> {
        Ok(models::l1info_leaf::Entity::delete_many()
            .filter(models::l1info_leaf::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await
            .map(|res| res.rows_affected)?)
    }

    /// Inserts a verify-batches event.
    async fn insert_verify_batches(&self, event: VerifyBatches) -> Result<(), DatabaseError> {
        let model: models::verify_batches::ActiveModel = event.into();
        models::verify_batches::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the most recent verify-batches event for the rollup.
    async fn get_last_verify_batches(
        &self,
        rollup_id: u32,
    ) -> Result<Option<VerifyBatches>, DatabaseError> {
        Ok(models::verify_batches::Entity::find()
            .filter(models::verify_batches::Column::RollupId.eq(rollup_id as i64))
            .order_by_desc(models::verify_batches::Column::BlockNum)
            .order_by_desc(models::verify_batches::Column::BlockPos)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the first verify-batches event for the rollup.
    async fn get_first_verify_batches(
        &self,
        rollup_id: u32,
    ) -> Result<Option<VerifyBatches>, DatabaseError> {
        Ok(models::verify_batches::Entity::find()
            .filter(models::verify_batches::Column::RollupId.eq(rollup_id as i64))
            .order_by_asc(models::verify_batches::Column::BlockNum)
            .order_by_asc(models::verify_batches::Column::BlockPos)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns the first verify-batches event for the rollup at or after the
    /// given block.
    async fn get_first_verify_batches_after_block(
        &self,
        rollup_id: u32,
        block_num: u64,
    ) -> Result<Option<VerifyBatches>, DatabaseError> {
        Ok(models::verify_batches::Entity::find()
            .filter(models::verify_batches::Column::RollupId.eq(rollup_id as i64))
            .filter(models::verify_batches::Column::BlockNum.gte(block_num as i64))
            .order_by_asc(models::verify_batches::Column::BlockNum)
            .order_by_asc(models::verify_batches::Column::BlockPos)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Deletes every verify-batches event at or after the provided block.
    async fn delete_verify_batches_gte(&self, block_num: u64) -> Result<u64, DatabaseError> {
        Ok(models::verify_batches::Entity::delete_many()
            .filter(models::verify_batches::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await
            .map(|res| res.rows_affected)?)
    }

    /// Stores the initial L1 info root snapshot.
    async fn set_init_l1info_root_map(
        &self,
        snapshot: InitL1InfoRootMap,
    ) -> Result<(), DatabaseError> {
        let model: models::init_root_map::ActiveModel = snapshot.into();
        let result = models::init_root_map::Entity::insert(model)
            .on_conflict_do_nothing()
            .exec(self.get_connection())
            .await;
        if matches!(result, Err(sea_orm::DbErr::RecordNotInserted)) {
            return Ok(());
        }
        result.map(|_| ())?;
        Ok(())
    }

    /// Returns the initial L1 info root snapshot, if any was recorded.
    async fn get_init_l1info_root_map(
        &self,
    ) -> Result<Option<InitL1InfoRootMap>, DatabaseError> {
        Ok(models::init_root_map::Entity::find()
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }
}

impl<T: DatabaseConnectionProvider> L1InfoTreeOperations for T {}
