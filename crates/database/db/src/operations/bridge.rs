use crate::{models, DatabaseConnectionProvider, DatabaseError};

use aggkit_primitives::{Bridge, Claim, LegacyTokenMigration, TokenMapping};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

/// Operations on the tables owned by a bridge syncer.
#[async_trait::async_trait]
pub trait BridgeOperations: DatabaseConnectionProvider {
    /// Inserts a bridge event.
    async fn insert_bridge(&self, bridge: Bridge) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", deposit_count = bridge.deposit_count, block = bridge.block_num, "inserting bridge event");
        let model: models::bridge_event::ActiveModel = bridge.into();
        models::bridge_event::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Inserts a claim event.
    async fn insert_claim(&self, claim: Claim) -> Result<(), DatabaseError> {
        let model: models::claim_event::ActiveModel = claim.into();
        models::claim_event::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Inserts a token mapping event.
    async fn insert_token_mapping(&self, mapping: TokenMapping) -> Result<(), DatabaseError> {
        let model: models::token_mapping::ActiveModel = mapping.into();
        models::token_mapping::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Inserts a legacy token migration event.
    async fn insert_legacy_token_migration(
        &self,
        migration: LegacyTokenMigration,
    ) -> Result<(), DatabaseError> {
        let model: models::legacy_token_migration::ActiveModel = migration.into();
        models::legacy_token_migration::Entity::insert(model)
            .exec(self.get_connection())
            .await
            .map(|_| ())?;
        Ok(())
    }

    /// Returns the bridge events in the inclusive block range, ordered by
    /// block number and position.
    async fn get_bridges_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Bridge>, DatabaseError> {
        Ok(models::bridge_event::Entity::find()
            .filter(models::bridge_event::Column::BlockNum.gte(from_block as i64))
            .filter(models::bridge_event::Column::BlockNum.lte(to_block as i64))
            .order_by_asc(models::bridge_event::Column::BlockNum)
            .order_by_asc(models::bridge_event::Column::BlockPos)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Returns the claim events in the inclusive block range, ordered by
    /// block number and position.
    async fn get_claims_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Claim>, DatabaseError> {
        Ok(models::claim_event::Entity::find()
            .filter(models::claim_event::Column::BlockNum.gte(from_block as i64))
            .filter(models::claim_event::Column::BlockNum.lte(to_block as i64))
            .order_by_asc(models::claim_event::Column::BlockNum)
            .order_by_asc(models::claim_event::Column::BlockPos)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Returns the bridge event with the given deposit count.
    async fn get_bridge_by_deposit_count(
        &self,
        deposit_count: u32,
    ) -> Result<Option<Bridge>, DatabaseError> {
        Ok(models::bridge_event::Entity::find()
            .filter(models::bridge_event::Column::DepositCount.eq(deposit_count as i64))
            .one(self.get_connection())
            .await?
            .map(Into::into))
    }

    /// Returns one page of bridge events, newest first, together with the
    /// total count.
    async fn get_bridges_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<Bridge>, u64), DatabaseError> {
        let total = models::bridge_event::Entity::find().count(self.get_connection()).await?;
        let bridges = models::bridge_event::Entity::find()
            .order_by_desc(models::bridge_event::Column::BlockNum)
            .order_by_desc(models::bridge_event::Column::BlockPos)
            .offset((page_number - 1) * page_size)
            .limit(page_size)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok((bridges, total))
    }

    /// Returns one page of claim events, newest first, together with the
    /// total count.
    async fn get_claims_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<Claim>, u64), DatabaseError> {
        let total = models::claim_event::Entity::find().count(self.get_connection()).await?;
        let claims = models::claim_event::Entity::find()
            .order_by_desc(models::claim_event::Column::BlockNum)
            .order_by_desc(models::claim_event::Column::BlockPos)
            .offset((page_number - 1) * page_size)
            .limit(page_size)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok((claims, total))
    }

    /// Returns one page of token mappings, newest first, together with the
    /// total count.
    async fn get_token_mappings_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<TokenMapping>, u64), DatabaseError> {
        let total = models::token_mapping::Entity::find().count(self.get_connection()).await?;
        let mappings = models::token_mapping::Entity::find()
            .order_by_desc(models::token_mapping::Column::BlockNum)
            .order_by_desc(models::token_mapping::Column::BlockPos)
            .offset((page_number - 1) * page_size)
            .limit(page_size)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok((mappings, total))
    }

    /// Returns one page of legacy token migrations, newest first, together
    /// with the total count.
    async fn get_legacy_token_migrations_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<LegacyTokenMigration>, u64), DatabaseError> {
        let total =
            models::legacy_token_migration::Entity::find().count(self.get_connection()).await?;
        let migrations = models::legacy_token_migration::Entity::find()
            .order_by_desc(models::legacy_token_migration::Column::BlockNum)
            .order_by_desc(models::legacy_token_migration::Column::BlockPos)
            .offset((page_number - 1) * page_size)
            .limit(page_size)
            .all(self.get_connection())
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok((migrations, total))
    }

    /// Returns the number of indexed bridge events.
    async fn count_bridges(&self) -> Result<u64, DatabaseError> {
        Ok(models::bridge_event::Entity::find().count(self.get_connection()).await?)
    }

    /// Deletes every bridge-domain row at or after the provided block.
    async fn delete_bridge_events_gte(&self, block_num: u64) -> Result<(), DatabaseError> {
        tracing::trace!(target: "aggkit::db", block_num, "deleting bridge events from block number");
        models::bridge_event::Entity::delete_many()
            .filter(models::bridge_event::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await?;
        models::claim_event::Entity::delete_many()
            .filter(models::claim_event::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await?;
        models::token_mapping::Entity::delete_many()
            .filter(models::token_mapping::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await?;
        models::legacy_token_migration::Entity::delete_many()
            .filter(models::legacy_token_migration::Column::BlockNum.gte(block_num as i64))
            .exec(self.get_connection())
            .await?;
        Ok(())
    }
}

impl<T: DatabaseConnectionProvider> BridgeOperations for T {}
