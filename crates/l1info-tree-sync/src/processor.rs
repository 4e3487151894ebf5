use crate::{
    event::{Event, UpdateL1InfoTree, UpdateL1InfoTreeV2, VerifyBatches},
    L1InfoTreeError,
};

use aggkit_db::{
    Database, DatabaseTransaction, InitL1InfoRootMap, L1InfoTreeOperations, SyncOperations,
    TreeOperations, TreeTag,
};
use aggkit_primitives::{BlockInfo, L1InfoTreeLeaf, RuntimeData, TreeRoot};
use aggkit_sync::{BlockProcessor, EvmBlock, ProcessorError};
use aggkit_tree::{AppendTree, Proof, UpdatableTree};
use alloy_primitives::B256;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The SQLite-backed processor of the L1 info tree syncer. Owns the L1 info
/// append tree and the rollup exit updatable tree; block processing is
/// atomic, queries run on committed state only.
#[derive(Debug, Clone)]
pub struct L1InfoTreeProcessor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    db: Database,
    trees: Mutex<Trees>,
    halted: Mutex<Option<String>>,
}

#[derive(Debug)]
struct Trees {
    l1_info: AppendTree,
    rollup_exit: UpdatableTree,
}

impl L1InfoTreeProcessor {
    /// Loads the processor state from the database.
    pub async fn new(db: Database) -> Result<Self, L1InfoTreeError> {
        let l1_info = AppendTree::load(&db, TreeTag::L1Info).await?;
        let rollup_exit = UpdatableTree::load(&db, TreeTag::RollupExit).await?;
        Ok(Self {
            inner: Arc::new(Inner {
                db,
                trees: Mutex::new(Trees { l1_info, rollup_exit }),
                halted: Mutex::new(None),
            }),
        })
    }

    /// Returns an error if an on-chain invariant violation halted the
    /// processor.
    pub async fn ensure_not_halted(&self) -> Result<(), L1InfoTreeError> {
        match self.inner.halted.lock().await.as_ref() {
            Some(reason) => Err(L1InfoTreeError::InconsistentState(reason.clone())),
            None => Ok(()),
        }
    }

    async fn halt(&self, reason: String) {
        tracing::error!(target: "aggkit::l1infotreesync", %reason, "halting processor");
        *self.inner.halted.lock().await = Some(reason);
    }

    async fn apply_event(
        &self,
        tx: &DatabaseTransaction,
        trees: &mut Trees,
        header_num: u64,
        event: Event,
    ) -> Result<(), L1InfoTreeError> {
        match event {
            Event::UpdateL1InfoTree(update) => {
                self.apply_l1_info_update(tx, trees, header_num, update).await
            }
            Event::UpdateL1InfoTreeV2(update) => self.check_l1_info_root(tx, trees, update).await,
            Event::VerifyBatches(verify) => {
                self.apply_verify_batches(tx, trees, header_num, verify).await
            }
            Event::InitL1InfoRootMap(init) => {
                tx.set_init_l1info_root_map(InitL1InfoRootMap {
                    leaf_count: init.leaf_count,
                    current_l1_info_root: init.current_l1_info_root,
                    block_num: header_num,
                })
                .await?;
                Ok(())
            }
        }
    }

    async fn apply_l1_info_update(
        &self,
        tx: &DatabaseTransaction,
        trees: &mut Trees,
        header_num: u64,
        update: UpdateL1InfoTree,
    ) -> Result<(), L1InfoTreeError> {
        let index = trees.l1_info.leaf_count();
        let leaf = L1InfoTreeLeaf {
            block_number: header_num,
            block_position: update.block_position,
            l1_info_tree_index: index,
            previous_block_hash: update.parent_hash,
            timestamp: update.timestamp,
            mainnet_exit_root: update.mainnet_exit_root,
            rollup_exit_root: update.rollup_exit_root,
        };
        let leaf_hash = leaf.hash();
        tx.insert_l1info_leaf(leaf).await?;
        trees.l1_info.add_leaf(tx, index, leaf_hash, header_num, update.block_position).await?;
        Ok(())
    }

    /// The on-chain root must match the locally reconstructed tree at the
    /// same leaf count. A mismatch is a fatal consistency error.
    async fn check_l1_info_root(
        &self,
        tx: &DatabaseTransaction,
        trees: &mut Trees,
        update: UpdateL1InfoTreeV2,
    ) -> Result<(), L1InfoTreeError> {
        if update.leaf_count != trees.l1_info.leaf_count() {
            let reason = format!(
                "UpdateL1InfoTreeV2 leaf count {} does not match the local tree leaf count {}",
                update.leaf_count,
                trees.l1_info.leaf_count()
            );
            self.halt(reason.clone()).await;
            return Err(L1InfoTreeError::InconsistentState(reason));
        }
        // the root of `leaf_count` leaves is the one versioned at index
        // count-1; read it through the transaction so in-flight appends of
        // the same block are visible.
        let local_root = tx
            .get_tree_root_by_index(TreeTag::L1Info, update.leaf_count - 1)
            .await?
            .map(|root| root.hash);
        if local_root == Some(update.current_l1_info_root) {
            return Ok(());
        }
        let reason = format!(
            "UpdateL1InfoTreeV2 root {} does not match the local tree root {:?} at leaf count {}",
            update.current_l1_info_root, local_root, update.leaf_count
        );
        self.halt(reason.clone()).await;
        Err(L1InfoTreeError::InconsistentState(reason))
    }

    async fn apply_verify_batches(
        &self,
        tx: &DatabaseTransaction,
        trees: &mut Trees,
        header_num: u64,
        verify: VerifyBatches,
    ) -> Result<(), L1InfoTreeError> {
        if verify.rollup_id == 0 {
            return Err(L1InfoTreeError::InvalidRollupId);
        }
        let root = trees
            .rollup_exit
            .upsert_leaf(
                tx,
                verify.rollup_id - 1,
                verify.exit_root,
                header_num,
                verify.block_position,
            )
            .await?;
        tx.insert_verify_batches(aggkit_db::VerifyBatches {
            block_num: header_num,
            block_pos: verify.block_position,
            rollup_id: verify.rollup_id,
            num_batch: verify.num_batch,
            state_root: verify.state_root,
            exit_root: verify.exit_root,
            aggregator: verify.aggregator,
            rollup_exit_root: root.hash,
        })
        .await?;
        Ok(())
    }

    async fn reload_trees(&self, trees: &mut Trees) -> Result<(), L1InfoTreeError> {
        trees.l1_info.reload(&self.inner.db).await?;
        trees.rollup_exit.reload(&self.inner.db).await?;
        Ok(())
    }

    // --- queries, all on committed state ---

    /// Returns the leaf at the given L1 info tree index.
    pub async fn get_info_by_index(&self, index: u32) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_l1info_leaf_by_index(index).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the leaf committing the given global exit root.
    pub async fn get_info_by_global_exit_root(
        &self,
        ger: B256,
    ) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_l1info_leaf_by_ger(ger).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the most recent leaf inserted at or before `block_num`.
    /// Fails with [`L1InfoTreeError::BlockNotProcessed`] if the block has
    /// not been processed yet.
    pub async fn get_latest_info_until_block(
        &self,
        block_num: u64,
    ) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let last_processed = self.inner.db.get_last_processed_block().await?.unwrap_or(0);
        if block_num > last_processed {
            return Err(L1InfoTreeError::BlockNotProcessed { block_num, last_processed });
        }
        self.inner
            .db
            .get_latest_l1info_until_block(block_num)
            .await?
            .ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the first leaf carrying the given rollup exit root.
    pub async fn get_first_info_with_rollup_exit_root(
        &self,
        rollup_exit_root: B256,
    ) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner
            .db
            .get_first_l1info_with_rollup_exit_root(rollup_exit_root)
            .await?
            .ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the most recent leaf.
    pub async fn get_last_info(&self) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_last_l1info_leaf().await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the first leaf.
    pub async fn get_first_info(&self) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_first_l1info_leaf().await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the first leaf inserted at or after `block_num`.
    pub async fn get_first_info_after_block(
        &self,
        block_num: u64,
    ) -> Result<L1InfoTreeLeaf, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_first_l1info_after_block(block_num).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the proof of the leaf at `index` together with the root it
    /// verifies against (the root recorded when the leaf was inserted at the
    /// requested index is the latest one).
    pub async fn get_l1_info_tree_merkle_proof(
        &self,
        index: u32,
    ) -> Result<(Proof, TreeRoot), L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let trees = self.inner.trees.lock().await;
        let root = trees.l1_info.get_root_by_index(&self.inner.db, index).await?;
        let proof = trees.l1_info.get_proof(&self.inner.db, index, root.hash).await?;
        Ok((proof, root))
    }

    /// Returns the proof of the leaf at `index` against an arbitrary
    /// historical root.
    pub async fn get_l1_info_tree_proof_from_index_to_root(
        &self,
        index: u32,
        root: B256,
    ) -> Result<Proof, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let trees = self.inner.trees.lock().await;
        Ok(trees.l1_info.get_proof(&self.inner.db, index, root).await?)
    }

    /// Returns the L1 info tree root recorded after the leaf at `index` was
    /// inserted.
    pub async fn get_l1_info_tree_root_by_index(
        &self,
        index: u32,
    ) -> Result<TreeRoot, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let trees = self.inner.trees.lock().await;
        Ok(trees.l1_info.get_root_by_index(&self.inner.db, index).await?)
    }

    /// Returns the last L1 info tree root.
    pub async fn get_last_l1_info_tree_root(&self) -> Result<TreeRoot, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let trees = self.inner.trees.lock().await;
        Ok(trees.l1_info.get_last_root(&self.inner.db).await?)
    }

    /// Returns the last rollup exit tree root.
    pub async fn get_last_rollup_exit_root(&self) -> Result<TreeRoot, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        let trees = self.inner.trees.lock().await;
        Ok(trees.rollup_exit.get_last_root(&self.inner.db).await?)
    }

    /// Returns the rollup exit tree proof for the given network against a
    /// historical rollup exit root. Network 0 (mainnet) is not part of the
    /// rollup exit tree and gets the canonical empty proof.
    pub async fn get_rollup_exit_tree_merkle_proof(
        &self,
        network_id: u32,
        root: B256,
    ) -> Result<Proof, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        if network_id == 0 {
            return Ok(aggkit_tree::empty_proof());
        }
        let trees = self.inner.trees.lock().await;
        Ok(trees.rollup_exit.get_proof(&self.inner.db, network_id - 1, root).await?)
    }

    /// Resolves the local exit root of a rollup under a historical rollup
    /// exit root.
    pub async fn get_local_exit_root(
        &self,
        network_id: u32,
        rollup_exit_root: B256,
    ) -> Result<B256, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        if network_id == 0 {
            return Err(L1InfoTreeError::InvalidRollupId);
        }
        let trees = self.inner.trees.lock().await;
        Ok(trees.rollup_exit.get_leaf(&self.inner.db, network_id - 1, rollup_exit_root).await?)
    }

    /// Returns the most recent verify-batches event for the rollup.
    pub async fn get_last_verified_batches(
        &self,
        rollup_id: u32,
    ) -> Result<aggkit_db::VerifyBatches, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_last_verify_batches(rollup_id).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the first verify-batches event for the rollup.
    pub async fn get_first_verified_batches(
        &self,
        rollup_id: u32,
    ) -> Result<aggkit_db::VerifyBatches, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_first_verify_batches(rollup_id).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the first verify-batches event for the rollup at or after the
    /// given block.
    pub async fn get_first_verified_batches_after_block(
        &self,
        rollup_id: u32,
        block_num: u64,
    ) -> Result<aggkit_db::VerifyBatches, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner
            .db
            .get_first_verify_batches_after_block(rollup_id, block_num)
            .await?
            .ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the initial L1 info root snapshot, if one was recorded.
    pub async fn get_init_l1_info_root_map(
        &self,
    ) -> Result<Option<InitL1InfoRootMap>, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        Ok(self.inner.db.get_init_l1info_root_map().await?)
    }

    /// Returns the last processed block at or before `block_num`, or the
    /// exact block if it was processed.
    pub async fn get_processed_block_until(
        &self,
        block_num: u64,
    ) -> Result<BlockInfo, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        self.inner.db.get_processed_block_until(block_num).await?.ok_or(L1InfoTreeError::NotFound)
    }

    /// Returns the highest processed block number.
    pub async fn last_processed_block(&self) -> Result<u64, L1InfoTreeError> {
        self.ensure_not_halted().await?;
        Ok(self.inner.db.get_last_processed_block().await?.unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl BlockProcessor for L1InfoTreeProcessor {
    type Event = Event;

    async fn process_block(&mut self, block: EvmBlock<Event>) -> Result<(), ProcessorError> {
        self.ensure_not_halted().await.map_err(|err| err.into_processor_error())?;

        let mut trees = self.inner.trees.lock().await;
        let tx = self.inner.db.tx().await.map_err(ProcessorError::other)?;

        let result: Result<(), L1InfoTreeError> = async {
            tx.insert_sync_block(
                BlockInfo::new(block.header.num, block.header.hash),
                block.header.timestamp,
            )
            .await?;
            for event in block.events {
                self.apply_event(&tx, &mut trees, block.header.num, event).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(ProcessorError::other)?;
                tracing::debug!(target: "aggkit::l1infotreesync", num = block.header.num, "processed block");
                Ok(())
            }
            Err(err) => {
                let _ = tx.rollback().await;
                // the in-memory frontiers may have advanced inside the
                // aborted transaction.
                self.reload_trees(&mut trees).await.map_err(|e| e.into_processor_error())?;
                Err(err.into_processor_error())
            }
        }
    }

    async fn reorg(&mut self, first_reorged_block: u64) -> Result<(), ProcessorError> {
        let mut trees = self.inner.trees.lock().await;
        let tx = self.inner.db.tx().await.map_err(ProcessorError::other)?;

        let result: Result<(), L1InfoTreeError> = async {
            tx.delete_sync_blocks_gte(first_reorged_block).await?;
            tx.delete_l1info_leaves_gte(first_reorged_block).await?;
            tx.delete_verify_batches_gte(first_reorged_block).await?;
            tx.delete_tree_roots_gte_block(TreeTag::L1Info, first_reorged_block).await?;
            tx.delete_tree_roots_gte_block(TreeTag::RollupExit, first_reorged_block).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(ProcessorError::other)?;
                self.reload_trees(&mut trees).await.map_err(|e| e.into_processor_error())?;
                tracing::info!(target: "aggkit::l1infotreesync", first_reorged_block, "reorged state");
                Ok(())
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err.into_processor_error())
            }
        }
    }

    async fn get_last_processed_block(&self) -> Result<u64, ProcessorError> {
        self.ensure_not_halted().await.map_err(|err| err.into_processor_error())?;
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
    use crate::event;

    use aggkit_db::test_utils::setup_test_db;
    use aggkit_primitives::u64_to_be_bytes;
    use aggkit_sync::EvmBlockHeader;
    use alloy_primitives::{keccak256, U256};

    async fn processor() -> L1InfoTreeProcessor {
        L1InfoTreeProcessor::new(setup_test_db().await).await.unwrap()
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

    fn update(mer: B256, rer: B256, parent: B256, timestamp: u64) -> Event {
        Event::UpdateL1InfoTree(event::UpdateL1InfoTree {
            block_position: 0,
            mainnet_exit_root: mer,
            rollup_exit_root: rer,
            parent_hash: parent,
            timestamp,
        })
    }

    #[tokio::test]
    async fn test_first_leaf_hash_matches_manual_computation() {
        // Given
        let mut processor = processor().await;
        let mer = B256::from(U256::from(0xbeefu64));
        let rer = B256::from(U256::from(0x5ca1eu64));
        let parent = B256::from(U256::from(0x1010101u64));

        let mut b = block(1, vec![update(mer, rer, parent, 420)]);
        b.header.parent_hash = parent;

        // When
        processor.process_block(b).await.unwrap();

        // Then
        let info = processor.get_latest_info_until_block(1).await.unwrap();
        let ger = keccak256([mer.as_slice(), rer.as_slice()].concat());
        let expected =
            keccak256([ger.as_slice(), parent.as_slice(), &u64_to_be_bytes(420)[..]].concat());
        assert_eq!(info.global_exit_root(), ger);
        assert_eq!(info.hash(), expected);
        assert_eq!(info.l1_info_tree_index, 0);
    }

    #[tokio::test]
    async fn test_v2_root_match_passes_and_mismatch_halts() {
        // Given: a processed leaf and the root the contract should report.
        let mut processor = processor().await;
        processor
            .process_block(block(1, vec![update(B256::repeat_byte(1), B256::repeat_byte(2), B256::ZERO, 1)]))
            .await
            .unwrap();
        let local_root = processor.get_last_l1_info_tree_root().await.unwrap();

        // When: the contract reports the same root, processing continues.
        processor
            .process_block(block(
                2,
                vec![Event::UpdateL1InfoTreeV2(event::UpdateL1InfoTreeV2 {
                    current_l1_info_root: local_root.hash,
                    leaf_count: 1,
                    block_hash: B256::ZERO,
                    min_timestamp: 0,
                })],
            ))
            .await
            .unwrap();

        // When: a later report diverges, the processor halts.
        let err = processor
            .process_block(block(
                3,
                vec![Event::UpdateL1InfoTreeV2(event::UpdateL1InfoTreeV2 {
                    current_l1_info_root: B256::repeat_byte(0xff),
                    leaf_count: 1,
                    block_hash: B256::ZERO,
                    min_timestamp: 0,
                })],
            ))
            .await
            .unwrap_err();
        assert!(err.is_inconsistent_state());

        // Then: the halt is sticky, every read fails the same way.
        assert!(matches!(
            processor.get_last_info().await,
            Err(L1InfoTreeError::InconsistentState(_))
        ));
        assert!(processor.get_last_processed_block().await.is_err());
    }

    #[tokio::test]
    async fn test_first_leaf_with_rollup_exit_root() {
        // Given: three leaves with distinct MERs and an identical RER.
        let mut processor = processor().await;
        let rer = B256::repeat_byte(0x33);
        for (i, mer) in [B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3)]
            .into_iter()
            .enumerate()
        {
            processor
                .process_block(block(i as u64 + 1, vec![update(mer, rer, B256::ZERO, i as u64)]))
                .await
                .unwrap();
        }

        // When
        let first = processor.get_first_info_with_rollup_exit_root(rer).await.unwrap();

        // Then: the first inserted leaf wins.
        assert_eq!(first.l1_info_tree_index, 0);
        assert_eq!(first.mainnet_exit_root, B256::repeat_byte(1));
    }

    #[tokio::test]
    async fn test_reorg_removes_leaves_and_restores_root() {
        // Given: leaves inserted at blocks 5 and 8.
        let mut processor = processor().await;
        processor
            .process_block(block(5, vec![update(B256::repeat_byte(5), B256::ZERO, B256::ZERO, 5)]))
            .await
            .unwrap();
        let root_after_block5 = processor.get_last_l1_info_tree_root().await.unwrap();
        processor
            .process_block(block(8, vec![update(B256::repeat_byte(8), B256::ZERO, B256::ZERO, 8)]))
            .await
            .unwrap();

        // When
        processor.reorg(6).await.unwrap();

        // Then
        assert!(processor.get_last_processed_block().await.unwrap() < 6);
        assert_eq!(
            processor.get_last_l1_info_tree_root().await.unwrap().hash,
            root_after_block5.hash
        );
        assert!(matches!(
            processor.get_info_by_index(1).await,
            Err(L1InfoTreeError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_verify_batches_updates_rollup_exit_tree() {
        // Given
        let mut processor = processor().await;
        let exit_root = B256::repeat_byte(0x44);
        processor
            .process_block(block(
                1,
                vec![Event::VerifyBatches(event::VerifyBatches {
                    block_position: 0,
                    rollup_id: 2,
                    num_batch: 7,
                    state_root: B256::repeat_byte(0x55),
                    exit_root,
                    aggregator: Default::default(),
                })],
            ))
            .await
            .unwrap();

        // Then: the leaf of rollup 2 sits at position 1 and resolves under
        // the recorded rollup exit root.
        let last = processor.get_last_verified_batches(2).await.unwrap();
        assert_eq!(last.exit_root, exit_root);
        let resolved = processor.get_local_exit_root(2, last.rollup_exit_root).await.unwrap();
        assert_eq!(resolved, exit_root);
    }

    #[tokio::test]
    async fn test_latest_info_for_unprocessed_block_fails() {
        let processor = processor().await;
        assert!(matches!(
            processor.get_latest_info_until_block(10).await,
            Err(L1InfoTreeError::BlockNotProcessed { .. })
        ));
    }
}
