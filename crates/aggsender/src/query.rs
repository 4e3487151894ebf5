//! Production implementations of the querier seams, wired to the syncers.

use crate::{
    error::AggsenderError,
    types::{BridgeQuerier, GerQuerier, L1InfoTreeDataQuerier},
};

use aggkit_agglayer::ProvenInsertedGerWithBlockNumber;
use aggkit_bridge_sync::BridgeProcessor;
use aggkit_client::EthClient;
use aggkit_l1info_tree_sync::L1InfoTreeProcessor;
use aggkit_primitives::{BlockNumberFinality, Bridge, Claim, L1InfoTreeLeaf, TreeRoot};
use aggkit_tree::Proof;
use alloy_primitives::B256;
use std::sync::Arc;

/// [`BridgeQuerier`] over the L2 bridge syncer.
#[derive(Debug)]
pub struct BridgeSyncQuerier {
    processor: BridgeProcessor,
}

impl BridgeSyncQuerier {
    /// Returns a new instance of [`BridgeSyncQuerier`].
    pub const fn new(processor: BridgeProcessor) -> Self {
        Self { processor }
    }
}

#[async_trait::async_trait]
impl BridgeQuerier for BridgeSyncQuerier {
    async fn get_bridges_and_claims(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<(Vec<Bridge>, Vec<Claim>), AggsenderError> {
        self.processor
            .get_bridges_and_claims(from_block, to_block)
            .await
            .map_err(|err| AggsenderError::BridgeQuery(err.to_string()))
    }

    async fn get_last_processed_block(&self) -> Result<u64, AggsenderError> {
        self.processor
            .last_processed_block()
            .await
            .map_err(|err| AggsenderError::BridgeQuery(err.to_string()))
    }

    async fn get_exit_root_by_index(&self, index: u32) -> Result<B256, AggsenderError> {
        self.processor
            .get_root_by_index(index)
            .await
            .map(|root| root.hash)
            .map_err(|err| AggsenderError::BridgeQuery(err.to_string()))
    }
}

/// [`L1InfoTreeDataQuerier`] over the L1 info tree syncer, anchored to the
/// finalized L1 head.
#[derive(Debug)]
pub struct L1InfoTreeSyncQuerier<C> {
    client: Arc<C>,
    processor: L1InfoTreeProcessor,
}

impl<C: EthClient> L1InfoTreeSyncQuerier<C> {
    /// Returns a new instance of [`L1InfoTreeSyncQuerier`].
    pub const fn new(client: Arc<C>, processor: L1InfoTreeProcessor) -> Self {
        Self { client, processor }
    }
}

#[async_trait::async_trait]
impl<C: EthClient> L1InfoTreeDataQuerier for L1InfoTreeSyncQuerier<C> {
    async fn get_finalized_l1_info_tree_data(
        &self,
    ) -> Result<(Proof, L1InfoTreeLeaf, TreeRoot), AggsenderError> {
        let finalized = self
            .client
            .header_by_tag(BlockNumberFinality::Finalized.as_tag())
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))?
            .ok_or_else(|| {
                AggsenderError::L1InfoTreeQuery("no finalized L1 head available".into())
            })?;

        let leaf = self
            .processor
            .get_latest_info_until_block(finalized.inner.number)
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))?;
        let root = self
            .processor
            .get_l1_info_tree_root_by_index(leaf.l1_info_tree_index)
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))?;
        let proof = self
            .processor
            .get_l1_info_tree_proof_from_index_to_root(leaf.l1_info_tree_index, root.hash)
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))?;
        Ok((proof, leaf, root))
    }

    async fn get_info_by_global_exit_root(
        &self,
        ger: B256,
    ) -> Result<Option<L1InfoTreeLeaf>, AggsenderError> {
        match self.processor.get_info_by_global_exit_root(ger).await {
            Ok(leaf) => Ok(Some(leaf)),
            Err(aggkit_l1info_tree_sync::L1InfoTreeError::NotFound) => Ok(None),
            Err(err) => Err(AggsenderError::L1InfoTreeQuery(err.to_string())),
        }
    }

    async fn get_proof_from_index_to_root(
        &self,
        index: u32,
        root: B256,
    ) -> Result<Proof, AggsenderError> {
        self.processor
            .get_l1_info_tree_proof_from_index_to_root(index, root)
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))
    }

    async fn get_rollup_exit_proof(
        &self,
        network_id: u32,
        rollup_exit_root: B256,
    ) -> Result<Proof, AggsenderError> {
        self.processor
            .get_rollup_exit_tree_merkle_proof(network_id, rollup_exit_root)
            .await
            .map_err(|err| AggsenderError::L1InfoTreeQuery(err.to_string()))
    }
}

/// A [`GerQuerier`] for chains without a GER-injection syncer: reports no
/// injected GERs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInjectedGers;

#[async_trait::async_trait]
impl GerQuerier for NoInjectedGers {
    async fn get_injected_gers_proofs(
        &self,
        _root: &TreeRoot,
        _from_block: u64,
        _to_block: u64,
    ) -> Result<Vec<ProvenInsertedGerWithBlockNumber>, AggsenderError> {
        Ok(Vec::new())
    }
}
