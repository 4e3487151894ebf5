use crate::{error::AggsenderError, prover::AggchainProof};

use aggkit_agglayer::{CertificateType, ProvenInsertedGerWithBlockNumber};
use aggkit_db::CertificateInfo;
use aggkit_primitives::{Bridge, Claim, L1InfoTreeLeaf, TreeRoot};
use aggkit_tree::Proof;
use alloy_primitives::B256;

/// Everything needed to assemble one certificate.
#[derive(Debug, Default, Clone)]
pub struct CertificateBuildParams {
    /// The first L2 block of the range.
    pub from_block: u64,
    /// The last L2 block of the range.
    pub to_block: u64,
    /// The retry count: 0 for a fresh certificate, previous + 1 for a
    /// re-send of an `InError` one.
    pub retry_count: u32,
    /// The bridge exits of the range.
    pub bridges: Vec<Bridge>,
    /// The claims of the range.
    pub claims: Vec<Claim>,
    /// The last certificate known to storage, if any.
    pub last_sent_certificate: Option<CertificateInfo>,
    /// Unix timestamp of the first submission of this range.
    pub created_at: u64,
    /// The type of certificate being built.
    pub certificate_type: CertificateType,
    /// The aggchain proof, present on the FEP and optimistic paths.
    pub aggchain_proof: Option<AggchainProof>,
    /// The finalized L1 info tree root claims are proven against.
    pub l1_info_tree_root_to_prove: B256,
    /// The leaf count of that root.
    pub l1_info_tree_leaf_count: u32,
}

impl CertificateBuildParams {
    /// Restricts the params to `[from_block, to_block]`, dropping bridges
    /// and claims outside the new range.
    pub fn range(mut self, from_block: u64, to_block: u64) -> Result<Self, AggsenderError> {
        if from_block < self.from_block || to_block > self.to_block {
            return Err(AggsenderError::InvalidBlockRange(format!(
                "cannot grow range [{}, {}] to [{from_block}, {to_block}]",
                self.from_block, self.to_block
            )));
        }
        self.from_block = from_block;
        self.to_block = to_block;
        self.bridges.retain(|bridge| bridge.block_num <= to_block);
        self.claims.retain(|claim| claim.block_num <= to_block);
        Ok(self)
    }

    /// True when the range contains no bridges and no claims.
    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty() && self.claims.is_empty()
    }
}

/// Read access to the L2 bridge syncer.
#[async_trait::async_trait]
pub trait BridgeQuerier: Send + Sync {
    /// Returns the bridges and claims of the inclusive block range.
    async fn get_bridges_and_claims(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<(Vec<Bridge>, Vec<Claim>), AggsenderError>;

    /// Returns the highest L2 block processed by the syncer.
    async fn get_last_processed_block(&self) -> Result<u64, AggsenderError>;

    /// Returns the local exit root recorded after the exit at `index` was
    /// inserted.
    async fn get_exit_root_by_index(&self, index: u32) -> Result<B256, AggsenderError>;
}

/// Read access to the L1 info tree syncer, anchored to finality.
#[async_trait::async_trait]
pub trait L1InfoTreeDataQuerier: Send + Sync {
    /// Returns the latest finalized L1 info tree leaf, its inclusion proof
    /// and the root the proof verifies against.
    async fn get_finalized_l1_info_tree_data(
        &self,
    ) -> Result<(Proof, L1InfoTreeLeaf, TreeRoot), AggsenderError>;

    /// Returns the leaf committing the given global exit root, `None` if the
    /// GER is not on the L1 info tree.
    async fn get_info_by_global_exit_root(
        &self,
        ger: B256,
    ) -> Result<Option<L1InfoTreeLeaf>, AggsenderError>;

    /// Returns the inclusion proof of the leaf at `index` against a
    /// historical root.
    async fn get_proof_from_index_to_root(
        &self,
        index: u32,
        root: B256,
    ) -> Result<Proof, AggsenderError>;

    /// Returns the rollup exit tree proof of the given network against a
    /// historical rollup exit root.
    async fn get_rollup_exit_proof(
        &self,
        network_id: u32,
        rollup_exit_root: B256,
    ) -> Result<Proof, AggsenderError>;
}

/// Read access to the GERs injected on the L2.
#[async_trait::async_trait]
pub trait GerQuerier: Send + Sync {
    /// Returns the proofs of the GERs injected in the inclusive L2 block
    /// range, against the given finalized L1 info root.
    async fn get_injected_gers_proofs(
        &self,
        root: &TreeRoot,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ProvenInsertedGerWithBlockNumber>, AggsenderError>;
}

/// Decides whether the optimistic path is active for the current tick.
pub trait OptimisticModeQuerier: Send + Sync {
    /// Returns true when the optimistic path is on.
    fn is_optimistic_mode_on(&self) -> Result<bool, AggsenderError>;
}

/// A querier pinned to one mode. The proof-generation tool hard-wires this
/// to `false`.
#[derive(Debug, Clone, Copy)]
pub struct StaticOptimisticModeQuerier(pub bool);

impl OptimisticModeQuerier for StaticOptimisticModeQuerier {
    fn is_optimistic_mode_on(&self) -> Result<bool, AggsenderError> {
        Ok(self.0)
    }
}

/// Signs the optimistic proof request on behalf of the trusted sequencer.
#[async_trait::async_trait]
pub trait OptimisticSigner: Send + Sync {
    /// Signs `(request, new_local_exit_root, claims)`.
    async fn sign(
        &self,
        request: &crate::prover::AggchainProofRequest,
        new_local_exit_root: B256,
        claims: &[Claim],
    ) -> Result<Vec<u8>, AggsenderError>;
}
