//! The bridge query service: the typed backend of the bridge REST API.
//!
//! The HTTP layer itself is plumbing and lives outside this crate; the
//! service defines the external contract: pagination rules, network-id
//! routing and the claim-proof covering-leaf search.

use aggkit_bridge_sync::{BridgeProcessor, BridgeSyncError};
use aggkit_l1info_tree_sync::{L1InfoTreeError, L1InfoTreeProcessor};
use aggkit_primitives::{Bridge, Claim, L1InfoTreeLeaf, LegacyTokenMigration, TokenMapping};
use aggkit_tree::Proof;
use std::sync::{Arc, Mutex};

/// The default page size when none is requested.
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// The maximum accepted page size.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// The error type of the bridge service.
#[derive(Debug, thiserror::Error)]
pub enum BridgeServiceError {
    /// The requested network id is neither L1 nor the configured L2.
    #[error("invalid network id {requested}: expected 0 (L1) or {l2_network_id} (L2)")]
    InvalidNetworkId {
        /// The requested id.
        requested: u32,
        /// The configured L2 id.
        l2_network_id: u32,
    },
    /// The pagination parameters are out of range.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),
    /// The bridge has not been included on the L1 info tree yet.
    #[error("this bridge has not been included on the L1 Info Tree yet")]
    NotOnL1Info,
    /// The requested row is not indexed.
    #[error("not found")]
    NotFound,
    /// A bridge syncer query failed.
    #[error(transparent)]
    Bridge(#[from] BridgeSyncError),
    /// An L1 info tree query failed.
    #[error(transparent)]
    L1InfoTree(#[from] L1InfoTreeError),
}

/// Validated pagination: 1-indexed page number, capped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageParams {
    /// The 1-indexed page number.
    pub page_number: u64,
    /// The page size.
    pub page_size: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page_number: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl PageParams {
    /// Validates raw query parameters, applying the defaults.
    pub fn new(
        page_number: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Self, BridgeServiceError> {
        let page_number = page_number.unwrap_or(1);
        if page_number == 0 {
            return Err(BridgeServiceError::InvalidPagination(
                "page_number is 1-indexed".into(),
            ));
        }
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(BridgeServiceError::InvalidPagination(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page_number, page_size })
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Paged<T> {
    /// The rows of the page.
    pub items: Vec<T>,
    /// The total number of rows.
    pub total: u64,
}

/// The inclusion proofs to claim a bridge exit, anchored to the L1 info
/// leaf that covers its deposit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimProof {
    /// Proof of the exit in its origin exit tree.
    pub proof_local_exit_root: Proof,
    /// Proof of the origin local exit root in the rollup exit tree, the
    /// canonical empty proof for L1-origin exits.
    pub proof_rollup_exit_root: Proof,
    /// The covering L1 info leaf.
    pub l1_info_tree_leaf: L1InfoTreeLeaf,
}

/// The sync progress of the service's indexers.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncStatus {
    /// The highest L1 block processed by the L1 bridge syncer.
    pub l1_bridge_block: u64,
    /// The highest L2 block processed by the L2 bridge syncer.
    pub l2_bridge_block: u64,
    /// The highest L1 block processed by the L1 info tree syncer.
    pub l1_info_tree_block: u64,
    /// The number of indexed L1 bridge events.
    pub l1_bridge_deposit_count: u64,
    /// The number of indexed L2 bridge events.
    pub l2_bridge_deposit_count: u64,
}

/// A recorded reorg, served by `last-reorg-event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReorgEvent {
    /// The lowest reorged block.
    pub first_reorged_block: u64,
    /// Whether the reorg happened on L1 or L2.
    pub is_l1: bool,
    /// Unix timestamp the reorg was observed at.
    pub detected_at: u64,
}

/// The bridge query service over the L1/L2 bridge syncers and the L1 info
/// tree syncer.
#[derive(Debug)]
pub struct BridgeService {
    l2_network_id: u32,
    l1_info_tree: L1InfoTreeProcessor,
    bridge_l1: BridgeProcessor,
    bridge_l2: BridgeProcessor,
    last_reorg: Arc<Mutex<Option<ReorgEvent>>>,
}

impl BridgeService {
    /// Returns a new instance of [`BridgeService`].
    pub fn new(
        l2_network_id: u32,
        l1_info_tree: L1InfoTreeProcessor,
        bridge_l1: BridgeProcessor,
        bridge_l2: BridgeProcessor,
    ) -> Self {
        Self {
            l2_network_id,
            l1_info_tree,
            bridge_l1,
            bridge_l2,
            last_reorg: Arc::new(Mutex::new(None)),
        }
    }

    /// Routes a network id to the backing bridge syncer: 0 is L1, the
    /// configured id is L2, anything else is rejected.
    fn bridge_for_network(&self, network_id: u32) -> Result<&BridgeProcessor, BridgeServiceError> {
        if network_id == 0 {
            Ok(&self.bridge_l1)
        } else if network_id == self.l2_network_id {
            Ok(&self.bridge_l2)
        } else {
            Err(BridgeServiceError::InvalidNetworkId {
                requested: network_id,
                l2_network_id: self.l2_network_id,
            })
        }
    }

    /// One page of bridges of the given network.
    pub async fn get_bridges(
        &self,
        network_id: u32,
        page: PageParams,
    ) -> Result<Paged<Bridge>, BridgeServiceError> {
        let (items, total) = self
            .bridge_for_network(network_id)?
            .get_bridges_paged(page.page_number, page.page_size)
            .await?;
        Ok(Paged { items, total })
    }

    /// One page of claims of the given network.
    pub async fn get_claims(
        &self,
        network_id: u32,
        page: PageParams,
    ) -> Result<Paged<Claim>, BridgeServiceError> {
        let (items, total) = self
            .bridge_for_network(network_id)?
            .get_claims_paged(page.page_number, page.page_size)
            .await?;
        Ok(Paged { items, total })
    }

    /// One page of token mappings of the given network.
    pub async fn get_token_mappings(
        &self,
        network_id: u32,
        page: PageParams,
    ) -> Result<Paged<TokenMapping>, BridgeServiceError> {
        let (items, total) = self
            .bridge_for_network(network_id)?
            .get_token_mappings_paged(page.page_number, page.page_size)
            .await?;
        Ok(Paged { items, total })
    }

    /// One page of legacy token migrations of the given network.
    pub async fn get_legacy_token_migrations(
        &self,
        network_id: u32,
        page: PageParams,
    ) -> Result<Paged<LegacyTokenMigration>, BridgeServiceError> {
        let (items, total) = self
            .bridge_for_network(network_id)?
            .get_legacy_token_migrations_paged(page.page_number, page.page_size)
            .await?;
        Ok(Paged { items, total })
    }

    /// The L1 info leaf at the given index, as injected on the L2.
    pub async fn injected_l1_info_leaf(
        &self,
        leaf_index: u32,
    ) -> Result<L1InfoTreeLeaf, BridgeServiceError> {
        Ok(self.l1_info_tree.get_info_by_index(leaf_index).await?)
    }

    /// The smallest L1 info tree index whose exit-root snapshot covers the
    /// given deposit count of the given network.
    pub async fn l1_info_tree_index_for_bridge(
        &self,
        network_id: u32,
        deposit_count: u32,
    ) -> Result<u32, BridgeServiceError> {
        self.bridge_for_network(network_id)?;
        if network_id == 0 {
            self.first_l1_info_index_for_l1_bridge(deposit_count).await
        } else {
            self.first_l1_info_index_for_l2_bridge(deposit_count).await
        }
    }

    /// Builds the proofs needed to claim the exit with the given deposit
    /// count, anchored to the covering L1 info leaf.
    pub async fn claim_proof(
        &self,
        network_id: u32,
        deposit_count: u32,
    ) -> Result<ClaimProof, BridgeServiceError> {
        let index = self.l1_info_tree_index_for_bridge(network_id, deposit_count).await?;
        let leaf = self.l1_info_tree.get_info_by_index(index).await?;

        if network_id == 0 {
            let proof_local_exit_root =
                self.bridge_l1.get_proof(deposit_count, leaf.mainnet_exit_root).await?;
            Ok(ClaimProof {
                proof_local_exit_root,
                proof_rollup_exit_root: aggkit_tree::empty_proof(),
                l1_info_tree_leaf: leaf,
            })
        } else {
            // the L2 exit is proven against the verified local exit root,
            // which in turn is proven inside the rollup exit tree.
            let verified = self
                .l1_info_tree
                .get_first_info_with_rollup_exit_root(leaf.rollup_exit_root)
                .await
                .map(|_| ())
                .is_ok();
            if !verified {
                return Err(BridgeServiceError::NotOnL1Info);
            }
            let local_exit_root = self
                .l1_info_tree
                .get_local_exit_root(self.l2_network_id, leaf.rollup_exit_root)
                .await?;
            let proof_local_exit_root =
                self.bridge_l2.get_proof(deposit_count, local_exit_root).await?;
            let proof_rollup_exit_root = self
                .l1_info_tree
                .get_rollup_exit_tree_merkle_proof(self.l2_network_id, leaf.rollup_exit_root)
                .await?;
            Ok(ClaimProof {
                proof_local_exit_root,
                proof_rollup_exit_root,
                l1_info_tree_leaf: leaf,
            })
        }
    }

    /// The sync progress snapshot.
    pub async fn sync_status(&self) -> Result<SyncStatus, BridgeServiceError> {
        Ok(SyncStatus {
            l1_bridge_block: self.bridge_l1.last_processed_block().await?,
            l2_bridge_block: self.bridge_l2.last_processed_block().await?,
            l1_info_tree_block: self.l1_info_tree.last_processed_block().await?,
            l1_bridge_deposit_count: self.bridge_l1.bridge_count().await?,
            l2_bridge_deposit_count: self.bridge_l2.bridge_count().await?,
        })
    }

    /// Records a reorg observation for `last-reorg-event`.
    pub fn record_reorg(&self, event: ReorgEvent) {
        *self.last_reorg.lock().expect("reorg mutex never poisoned") = Some(event);
    }

    /// The most recent recorded reorg, if any.
    pub fn last_reorg_event(&self) -> Option<ReorgEvent> {
        *self.last_reorg.lock().expect("reorg mutex never poisoned")
    }

    /// Binary search between the first and last blocks where the L1 info
    /// tree was updated: find the smallest leaf whose mainnet exit root
    /// already includes `deposit_count`.
    async fn first_l1_info_index_for_l1_bridge(
        &self,
        deposit_count: u32,
    ) -> Result<u32, BridgeServiceError> {
        let last_info = self.l1_info_tree.get_last_info().await.map_err(not_found)?;
        let root = self
            .bridge_l1
            .get_root_by_local_exit_root(last_info.mainnet_exit_root)
            .await
            .map_err(|_| BridgeServiceError::NotOnL1Info)?;
        if root.index < deposit_count {
            return Err(BridgeServiceError::NotOnL1Info);
        }

        let first_info = self.l1_info_tree.get_first_info().await.map_err(not_found)?;

        let mut best = last_info;
        let mut lower = first_info.block_number;
        let mut upper = best.block_number;
        while lower <= upper {
            let target_block = lower + (upper - lower) / 2;
            let target =
                self.l1_info_tree.get_first_info_after_block(target_block).await.map_err(not_found)?;
            let root = self
                .bridge_l1
                .get_root_by_local_exit_root(target.mainnet_exit_root)
                .await
                .map_err(|_| BridgeServiceError::NotOnL1Info)?;
            if root.index < deposit_count {
                lower = target_block + 1;
            } else if root.index == deposit_count {
                best = target;
                break;
            } else {
                upper = target_block.saturating_sub(1);
                best = target;
                if target_block == 0 {
                    break;
                }
            }
        }

        Ok(best.l1_info_tree_index)
    }

    /// Same search over verify-batches events: find the smallest verified
    /// local exit root including `deposit_count`, then the first L1 info
    /// leaf carrying its rollup exit root.
    async fn first_l1_info_index_for_l2_bridge(
        &self,
        deposit_count: u32,
    ) -> Result<u32, BridgeServiceError> {
        let last_verified = self
            .l1_info_tree
            .get_last_verified_batches(self.l2_network_id)
            .await
            .map_err(|_| BridgeServiceError::NotOnL1Info)?;
        let root = self
            .bridge_l2
            .get_root_by_local_exit_root(last_verified.exit_root)
            .await
            .map_err(|_| BridgeServiceError::NotOnL1Info)?;
        if root.index < deposit_count {
            return Err(BridgeServiceError::NotOnL1Info);
        }

        let first_verified = self
            .l1_info_tree
            .get_first_verified_batches(self.l2_network_id)
            .await
            .map_err(not_found)?;

        let mut best = last_verified;
        let mut lower = first_verified.block_num;
        let mut upper = best.block_num;
        while lower <= upper {
            let target_block = lower + (upper - lower) / 2;
            let target = self
                .l1_info_tree
                .get_first_verified_batches_after_block(self.l2_network_id, target_block)
                .await
                .map_err(not_found)?;
            let root = self
                .bridge_l2
                .get_root_by_local_exit_root(target.exit_root)
                .await
                .map_err(|_| BridgeServiceError::NotOnL1Info)?;
            if root.index < deposit_count {
                lower = target_block + 1;
            } else if root.index == deposit_count {
                best = target;
                break;
            } else {
                upper = target_block.saturating_sub(1);
                best = target;
                if target_block == 0 {
                    break;
                }
            }
        }

        let info = self
            .l1_info_tree
            .get_first_info_with_rollup_exit_root(best.rollup_exit_root)
            .await
            .map_err(not_found)?;
        Ok(info.l1_info_tree_index)
    }
}

fn not_found(err: L1InfoTreeError) -> BridgeServiceError {
    match err {
        L1InfoTreeError::NotFound => BridgeServiceError::NotFound,
        other => BridgeServiceError::L1InfoTree(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aggkit_bridge_sync::Event as BridgeEvent;
    use aggkit_db::test_utils::setup_test_db;
    use aggkit_l1info_tree_sync::{Event as L1InfoEvent, UpdateL1InfoTree};
    use aggkit_sync::{BlockProcessor, EvmBlock, EvmBlockHeader};
    use alloy_primitives::{B256, U256};

    fn block<E>(num: u64, events: Vec<E>) -> EvmBlock<E> {
        EvmBlock {
            header: EvmBlockHeader {
                num,
                hash: B256::from(U256::from(num)),
                parent_hash: B256::from(U256::from(num.saturating_sub(1))),
                timestamp: num,
            },
            is_finalized: true,
            events,
        }
    }

    fn deposit(block_num: u64, deposit_count: u32) -> aggkit_primitives::Bridge {
        aggkit_primitives::Bridge {
            block_num,
            deposit_count,
            amount: U256::from(100u64 + deposit_count as u64),
            ..Default::default()
        }
    }

    /// Three L1 deposits, each mirrored by an L1 info leaf carrying the
    /// mainnet exit root right after it.
    async fn service_with_l1_history() -> (BridgeService, Vec<B256>) {
        let mut bridge_l1 = BridgeProcessor::new(setup_test_db().await).await.unwrap();
        let bridge_l2 = BridgeProcessor::new(setup_test_db().await).await.unwrap();
        let mut l1_info = L1InfoTreeProcessor::new(setup_test_db().await).await.unwrap();

        let mut mers = Vec::new();
        for i in 0..3u32 {
            bridge_l1
                .process_block(block(i as u64 + 1, vec![BridgeEvent::Bridge(deposit(i as u64 + 1, i))]))
                .await
                .unwrap();
            mers.push(bridge_l1.get_root_by_index(i).await.unwrap().hash);
        }
        for (i, mer) in mers.iter().enumerate() {
            l1_info
                .process_block(block(
                    11 + i as u64,
                    vec![L1InfoEvent::UpdateL1InfoTree(UpdateL1InfoTree {
                        block_position: 0,
                        mainnet_exit_root: *mer,
                        rollup_exit_root: B256::ZERO,
                        parent_hash: B256::ZERO,
                        timestamp: 100 + i as u64,
                    })],
                ))
                .await
                .unwrap();
        }

        let service =
            BridgeService::new(2, l1_info.clone(), bridge_l1.clone(), bridge_l2.clone());
        (service, mers)
    }

    #[test]
    fn test_page_params_defaults_and_validation() {
        assert_eq!(PageParams::new(None, None).unwrap(), PageParams::default());
        assert!(matches!(
            PageParams::new(Some(0), None),
            Err(BridgeServiceError::InvalidPagination(_))
        ));
        assert!(matches!(
            PageParams::new(None, Some(0)),
            Err(BridgeServiceError::InvalidPagination(_))
        ));
        assert!(matches!(
            PageParams::new(None, Some(MAX_PAGE_SIZE + 1)),
            Err(BridgeServiceError::InvalidPagination(_))
        ));
        assert!(PageParams::new(Some(3), Some(MAX_PAGE_SIZE)).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_network_is_rejected() {
        let (service, _) = service_with_l1_history().await;
        let err = service.get_bridges(7, PageParams::default()).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeServiceError::InvalidNetworkId { requested: 7, l2_network_id: 2 }
        ));
    }

    #[tokio::test]
    async fn test_network_zero_routes_to_l1() {
        let (service, _) = service_with_l1_history().await;
        let page = service.get_bridges(0, PageParams::default()).await.unwrap();
        assert_eq!(page.total, 3);
        let page = service.get_bridges(2, PageParams::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_covering_leaf_search_finds_smallest_index() {
        let (service, _) = service_with_l1_history().await;

        // deposit 0 is covered by the first leaf, deposit 2 by the third.
        assert_eq!(service.l1_info_tree_index_for_bridge(0, 0).await.unwrap(), 0);
        assert_eq!(service.l1_info_tree_index_for_bridge(0, 1).await.unwrap(), 1);
        assert_eq!(service.l1_info_tree_index_for_bridge(0, 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_uncovered_deposit_is_not_on_l1_info() {
        let (service, _) = service_with_l1_history().await;
        let err = service.l1_info_tree_index_for_bridge(0, 5).await.unwrap_err();
        assert!(matches!(err, BridgeServiceError::NotOnL1Info));
    }

    #[tokio::test]
    async fn test_claim_proof_verifies_against_the_covering_leaf() {
        let (service, mers) = service_with_l1_history().await;

        let proof = service.claim_proof(0, 1).await.unwrap();
        assert_eq!(proof.l1_info_tree_leaf.l1_info_tree_index, 1);
        assert_eq!(proof.l1_info_tree_leaf.mainnet_exit_root, mers[1]);
        assert_eq!(proof.proof_rollup_exit_root, aggkit_tree::empty_proof());

        let folded = aggkit_tree::compute_root_from_proof(
            deposit(2, 1).hash(),
            1,
            &proof.proof_local_exit_root,
        );
        assert_eq!(folded, mers[1]);
    }

    #[tokio::test]
    async fn test_reorg_event_round_trip() {
        let (service, _) = service_with_l1_history().await;
        assert!(service.last_reorg_event().is_none());
        let event = ReorgEvent { first_reorged_block: 42, is_l1: true, detected_at: 1000 };
        service.record_reorg(event);
        assert_eq!(service.last_reorg_event(), Some(event));
    }
}
