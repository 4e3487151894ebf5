use crate::{event::Event, BridgeSyncError};

use aggkit_db::{
    BridgeOperations, Database, DatabaseTransaction, SyncOperations, TreeOperations, TreeTag,
};
use aggkit_primitives::{
    Bridge, BlockInfo, Claim, LegacyTokenMigration, RuntimeData, TokenMapping, TreeRoot,
};
use aggkit_sync::{BlockProcessor, EvmBlock, ProcessorError};
use aggkit_tree::{AppendTree, Proof};
use alloy_primitives::B256;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The SQLite-backed processor of a bridge syncer. Bridge events fold into
/// the local exit tree at their deposit count; claims, token mappings and
/// legacy migrations are plain event tables.
#[derive(Debug, Clone)]
pub struct BridgeProcessor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    db: Database,
    local_exit_tree: Mutex<AppendTree>,
}

impl BridgeProcessor {
    /// Loads the processor state from the database.
    pub async fn new(db: Database) -> Result<Self, BridgeSyncError> {
        let local_exit_tree = AppendTree::load(&db, TreeTag::LocalExit).await?;
        Ok(Self { inner: Arc::new(Inner { db, local_exit_tree: Mutex::new(local_exit_tree) }) })
    }

    async fn apply_event(
        &self,
        tx: &DatabaseTransaction,
        tree: &mut AppendTree,
        event: Event,
    ) -> Result<(), BridgeSyncError> {
        match event {
            Event::Bridge(bridge) => {
                let leaf_hash = bridge.hash();
                tree.add_leaf(
                    tx,
                    bridge.deposit_count,
                    leaf_hash,
                    bridge.block_num,
                    bridge.block_pos,
                )
                .await?;
                tx.insert_bridge(bridge).await?;
            }
            Event::Claim(claim) => tx.insert_claim(claim).await?,
            Event::TokenMapping(mapping) => tx.insert_token_mapping(mapping).await?,
            Event::LegacyTokenMigration(migration) => {
                tx.insert_legacy_token_migration(migration).await?
            }
        }
        Ok(())
    }

    // --- queries, all on committed state ---

    /// Returns the bridge events in the inclusive block range.
    pub async fn get_bridges(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Bridge>, BridgeSyncError> {
        Ok(self.inner.db.get_bridges_in_range(from_block, to_block).await?)
    }

    /// Returns the claim events in the inclusive block range.
    pub async fn get_claims(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Claim>, BridgeSyncError> {
        Ok(self.inner.db.get_claims_in_range(from_block, to_block).await?)
    }

    /// Returns the bridges and claims of the inclusive block range.
    pub async fn get_bridges_and_claims(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<(Vec<Bridge>, Vec<Claim>), BridgeSyncError> {
        Ok((
            self.get_bridges(from_block, to_block).await?,
            self.get_claims(from_block, to_block).await?,
        ))
    }

    /// Returns one page of bridge events plus the total count.
    pub async fn get_bridges_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<Bridge>, u64), BridgeSyncError> {
        Ok(self.inner.db.get_bridges_paged(page_number, page_size).await?)
    }

    /// Returns one page of claim events plus the total count.
    pub async fn get_claims_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<Claim>, u64), BridgeSyncError> {
        Ok(self.inner.db.get_claims_paged(page_number, page_size).await?)
    }

    /// Returns one page of token mappings plus the total count.
    pub async fn get_token_mappings_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<TokenMapping>, u64), BridgeSyncError> {
        Ok(self.inner.db.get_token_mappings_paged(page_number, page_size).await?)
    }

    /// Returns one page of legacy token migrations plus the total count.
    pub async fn get_legacy_token_migrations_paged(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<(Vec<LegacyTokenMigration>, u64), BridgeSyncError> {
        Ok(self.inner.db.get_legacy_token_migrations_paged(page_number, page_size).await?)
    }

    /// Returns the bridge event with the given deposit count.
    pub async fn get_bridge_by_deposit_count(
        &self,
        deposit_count: u32,
    ) -> Result<Bridge, BridgeSyncError> {
        self.inner
            .db
            .get_bridge_by_deposit_count(deposit_count)
            .await?
            .ok_or(BridgeSyncError::NotFound)
    }

    /// Returns the number of indexed bridge events.
    pub async fn bridge_count(&self) -> Result<u64, BridgeSyncError> {
        Ok(self.inner.db.count_bridges().await?)
    }

    /// Returns the inclusion proof of the exit at `deposit_count` against the
    /// given local exit root.
    pub async fn get_proof(
        &self,
        deposit_count: u32,
        local_exit_root: B256,
    ) -> Result<Proof, BridgeSyncError> {
        let tree = self.inner.local_exit_tree.lock().await;
        Ok(tree.get_proof(&self.inner.db, deposit_count, local_exit_root).await?)
    }

    /// Returns the versioned local exit root equal to the given hash.
    pub async fn get_root_by_local_exit_root(
        &self,
        local_exit_root: B256,
    ) -> Result<TreeRoot, BridgeSyncError> {
        let tree = self.inner.local_exit_tree.lock().await;
        Ok(tree.get_root_by_hash(&self.inner.db, local_exit_root).await?)
    }

    /// Returns the local exit root recorded after the exit at `index` was
    /// inserted.
    pub async fn get_root_by_index(&self, index: u32) -> Result<TreeRoot, BridgeSyncError> {
        let tree = self.inner.local_exit_tree.lock().await;
        Ok(tree.get_root_by_index(&self.inner.db, index).await?)
    }

    /// Returns the most recent local exit root.
    pub async fn get_last_local_exit_root(&self) -> Result<TreeRoot, BridgeSyncError> {
        let tree = self.inner.local_exit_tree.lock().await;
        Ok(tree.get_last_root(&self.inner.db).await?)
    }

    /// Returns the highest processed block number.
    pub async fn last_processed_block(&self) -> Result<u64, BridgeSyncError> {
        Ok(self.inner.db.get_last_processed_block().await?.unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl BlockProcessor for BridgeProcessor {
    type Event = Event;

    async fn process_block(&mut self, block: EvmBlock<Event>) -> Result<(), ProcessorError> {
        let mut tree = self.inner.local_exit_tree.lock().await;
        let tx = self.inner.db.tx().await.map_err(ProcessorError::other)?;

        let result: Result<(), BridgeSyncError> = async {
            tx.insert_sync_block(
                BlockInfo::new(block.header.num, block.header.hash),
                block.header.timestamp,
            )
            .await?;
            for event in block.events {
                self.apply_event(&tx, &mut tree, event).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(ProcessorError::other)?;
                tracing::debug!(target: "aggkit::bridgesync", num = block.header.num, "processed block");
                Ok(())
            }
            Err(err) => {
                let _ = tx.rollback().await;
                tree.reload(&self.inner.db).await.map_err(ProcessorError::other)?;
                Err(ProcessorError::other(err))
            }
        }
    }

    async fn reorg(&mut self, first_reorged_block: u64) -> Result<(), ProcessorError> {
        let mut tree = self.inner.local_exit_tree.lock().await;
        let tx = self.inner.db.tx().await.map_err(ProcessorError::other)?;

        let result: Result<(), BridgeSyncError> = async {
            tx.delete_sync_blocks_gte(first_reorged_block).await?;
            tx.delete_bridge_events_gte(first_reorged_block).await?;
            tx.delete_tree_roots_gte_block(TreeTag::LocalExit, first_reorged_block).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(ProcessorError::other)?;
                tree.reload(&self.inner.db).await.map_err(ProcessorError::other)?;
                tracing::info!(target: "aggkit::bridgesync", first_reorged_block, "reorged state");
                Ok(())
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(ProcessorError::other(err))
            }
        }
    }

    async fn get_last_processed_block(&self) -> Result<u64, ProcessorError> {
        Ok(self
            .inner
            .db
            .get_last_processed_block()
            .await
            .map_err(ProcessorError::other)?
            .unwrap_or(0))
    }

    async fn get_runtime_data(&self) -> Result<Option<RuntimeData>, ProcessorError> {
        self.inner.db.get_runtime_data().await.map_err(ProcessorError::other)
    }

    async fn set_runtime_data(&self, data: RuntimeData) -> Result<(), ProcessorError> {
        self.inner.db.set_runtime_data(data).await.map_err(ProcessorError::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aggkit_db::test_utils::setup_test_db;
    use aggkit_primitives::GlobalIndex;
    use aggkit_sync::EvmBlockHeader;
    use alloy_primitives::U256;

    async fn processor() -> BridgeProcessor {
        BridgeProcessor::new(setup_test_db().await).await.unwrap()
    }

    fn block(num: u64, events: Vec<Event>) -> EvmBlock<Event> {
        EvmBlock {
            header: EvmBlockHeader {
                num,
                hash: B256::from(U256::from(num)),
                parent_hash: B256::from(U256::from(num.saturating_sub(1))),
                timestamp: num * 12,
            },
            is_finalized: false,
            events,
        }
    }

    fn bridge(block_num: u64, deposit_count: u32) -> Bridge {
        Bridge {
            block_num,
            block_pos: deposit_count as u64,
            amount: U256::from(1000u64 + deposit_count as u64),
            deposit_count,
            destination_network: 1,
            ..Default::default()
        }
    }

    fn claim(block_num: u64, leaf_index: u32) -> Claim {
        Claim {
            block_num,
            block_pos: 0,
            global_index: GlobalIndex::new(true, 0, leaf_index).encode(),
            amount: U256::from(5u64),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bridges_fold_into_the_local_exit_tree() {
        // Given
        let mut processor = processor().await;
        processor
            .process_block(
                block(1, vec![Event::Bridge(bridge(1, 0)), Event::Bridge(bridge(1, 1))]),
            )
            .await
            .unwrap();

        // Then: the root at index 1 is the latest and proves both exits.
        let root = processor.get_root_by_index(1).await.unwrap();
        assert_eq!(processor.get_last_local_exit_root().await.unwrap().hash, root.hash);

        let proof = processor.get_proof(0, root.hash).await.unwrap();
        assert_eq!(
            aggkit_tree::compute_root_from_proof(bridge(1, 0).hash(), 0, &proof),
            root.hash
        );

        // the root resolves back to its leaf index by hash.
        let by_hash = processor.get_root_by_local_exit_root(root.hash).await.unwrap();
        assert_eq!(by_hash.index, 1);
    }

    #[tokio::test]
    async fn test_range_queries_are_inclusive_and_ordered() {
        // Given
        let mut processor = processor().await;
        processor.process_block(block(5, vec![Event::Bridge(bridge(5, 0))])).await.unwrap();
        processor
            .process_block(block(6, vec![Event::Claim(claim(6, 0)), Event::Bridge(bridge(6, 1))]))
            .await
            .unwrap();
        processor.process_block(block(9, vec![Event::Bridge(bridge(9, 2))])).await.unwrap();

        // When
        let (bridges, claims) = processor.get_bridges_and_claims(5, 6).await.unwrap();

        // Then
        assert_eq!(bridges.iter().map(|b| b.block_num).collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].decoded_global_index(), GlobalIndex::new(true, 0, 0));
    }

    #[tokio::test]
    async fn test_reorg_removes_bridges_and_tree_roots() {
        // Given
        let mut processor = processor().await;
        processor.process_block(block(5, vec![Event::Bridge(bridge(5, 0))])).await.unwrap();
        let root_after_block5 = processor.get_last_local_exit_root().await.unwrap();
        processor.process_block(block(8, vec![Event::Bridge(bridge(8, 1))])).await.unwrap();

        // When
        processor.reorg(6).await.unwrap();

        // Then
        assert!(processor.get_last_processed_block().await.unwrap() < 6);
        assert_eq!(
            processor.get_last_local_exit_root().await.unwrap().hash,
            root_after_block5.hash
        );
        assert!(matches!(
            processor.get_bridge_by_deposit_count(1).await,
            Err(BridgeSyncError::NotFound)
        ));

        // appends resume at the rolled-back deposit count.
        processor.process_block(block(9, vec![Event::Bridge(bridge(9, 1))])).await.unwrap();
        assert_eq!(processor.get_last_local_exit_root().await.unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_paged_readers_report_totals() {
        // Given
        let mut processor = processor().await;
        for i in 0..5u64 {
            processor
                .process_block(block(i + 1, vec![Event::Bridge(bridge(i + 1, i as u32))]))
                .await
                .unwrap();
        }

        // When
        let (page, total) = processor.get_bridges_paged(1, 2).await.unwrap();

        // Then: newest first, total over all rows.
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|b| b.block_num).collect::<Vec<_>>(), vec![5, 4]);

        let (page, total) = processor.get_bridges_paged(3, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|b| b.block_num).collect::<Vec<_>>(), vec![1]);
    }
}
