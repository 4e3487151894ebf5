use crate::{models, DatabaseConnectionProvider, DatabaseError};

use aggkit_primitives::{BlockInfo, RuntimeData};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};

/// Operations on the processed-block table shared by every syncer database.
#[async_trait::async_trait]
pub trait SyncOperations: DatabaseConnectionProvider {
    /// Inserts a processed block.
    async fn insert_sync_block(
        &self,
        block: BlockInfo,
        timestamp: u64,
    ) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", number = block.number, hash = ?block.hash, "inserting processed block");
        let model: models::sync_block::ActiveModel = (block, timestamp).into();
        models::sync_block::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the highest processed block number, `None` for an empty
    /// database.
    async fn get_last_processed_block(&self) -> Result<Option<u64>, DatabaseError> {
        Ok(models::sync_block::Entity::find()
            .order_by_desc(models::sync_block::Column::BlockNum)
            .one(self.get_connection())
            .await?
            .map(|model| BlockInfo::from(model).number))
    }

    /// Returns the last processed block at or before `block_num`. If
    /// `block_num` itself was processed, it is returned exactly.
    async fn get_processed_block_until(
        &self,
        block_num: u64,
    ) -> Result<Option<BlockInfo>, DatabaseError> {
        Ok(models::sync_block::Entity::find()
            .filter(models::sync_block::Column::BlockNum.lte(block_num as i64))
            .order_by_desc(models::sync_block::Column::BlockNum)
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Deletes every processed block with a number greater than or equal to
    /// the provided one, returning the number of deleted rows.
    async fn delete_sync_blocks_gte(&self, block_num: u64) -> Result<u64, DatabaseError> {
        tracing::trace!(target: "aggkit::db", block_num, "deleting processed blocks from block number");
        Ok(models::sync_block::Entity::delete_many()
            .filter(models::sync_block::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await
            .map(|res| res.rows_affected)?)
    }

    /// Returns the stored runtime identity of the owning syncer.
    async fn get_runtime_data(&self) -> Result<Option<RuntimeData>, DatabaseError> {
        models::runtime_data::Entity::find()
            .one(self.get_connection())
            .await?
            .map(|model| Ok(model.try_into()?))
            .transpose()
    }

    /// Persists the runtime identity of the owning syncer.
    async fn set_runtime_data(&self, data: RuntimeData) -> Result<(), DatabaseError> {
        let model: models::runtime_data::ActiveModel = data.try_into()?;
        models::runtime_data::Entity::insert(model)
            .on_conflict(
                OnConflict::column(models::runtime_data::Column::Id)
                    .update_columns(vec![
                        models::runtime_data::Column::ChainId,
                        models::runtime_data::Column::Addresses,
                    ])
                    .to_owned(),
            )
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }
}

impl<T: DatabaseConnectionProvider> SyncOperations for T {}
