use aggkit_agglayer::{
    ImportedBridgeExitWithBlockNumber, L1InfoTreeLeaf, MerkleProof,
    ProvenInsertedGerWithBlockNumber,
};
use alloy_primitives::B256;
use std::collections::BTreeMap;

/// An error returned by the aggchain prover service.
#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    /// The prover has not built any proof covering the requested range yet.
    /// Not fatal: the aggsender skips the tick and asks again later. Maps
    /// the gRPC `Unavailable` / "has not built any proof yet" response.
    #[error("prover has not built any proof yet")]
    NoProofBuiltYet,
    /// The transport to the prover failed.
    #[error("prover transport error: {0}")]
    Transport(String),
    /// The prover rejected the request.
    #[error("prover rejected request: {0}")]
    Rejected(String),
}

/// The SP1 stark proof material returned by the prover.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Sp1StarkProof {
    /// The proof bytes.
    pub proof: Vec<u8>,
    /// The prover version.
    pub version: String,
    /// The verification key.
    pub vkey: Vec<u8>,
}

/// An aggchain proof attesting to the evolution of the local exit tree over
/// `(last_proven_block, end_block]`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AggchainProof {
    /// The stark proof.
    pub sp1_stark_proof: Sp1StarkProof,
    /// The block the proof starts after.
    pub last_proven_block: u64,
    /// The last block covered by the proof. May be smaller than the
    /// requested end block.
    pub end_block: u64,
    /// The local exit root after `end_block` as computed by the prover.
    pub local_exit_root: B256,
    /// The aggchain params committed by the proof.
    pub aggchain_params: B256,
    /// The proof context map.
    pub context: BTreeMap<String, Vec<u8>>,
    /// Opaque chain-specific data forwarded to the settlement contract.
    pub custom_chain_data: Vec<u8>,
}

/// The request shipped to the prover, mirroring `aggkit.prover.v1`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AggchainProofRequest {
    /// The block the requested proof must start after.
    pub last_proven_block: u64,
    /// The last block the proof should cover. The prover may return less.
    pub requested_end_block: u64,
    /// The finalized L1 info tree root the claims are proven against.
    pub l1_info_tree_root_hash: B256,
    /// The finalized L1 info tree leaf.
    pub l1_info_tree_leaf: L1InfoTreeLeaf,
    /// The inclusion proof of the leaf.
    pub l1_info_tree_merkle_proof: MerkleProof,
    /// The GERs injected on the L2 in the range, with their proofs.
    pub ger_leaves_with_block_number: Vec<ProvenInsertedGerWithBlockNumber>,
    /// The imported bridge exits of the range.
    pub imported_bridge_exits_with_block_number: Vec<ImportedBridgeExitWithBlockNumber>,
}

/// The client interface of the external aggchain prover. The gRPC transport
/// is out of scope; tests run against fakes.
#[async_trait::async_trait]
pub trait AggchainProofClient: Send + Sync {
    /// Requests an aggchain proof for the range.
    async fn generate_aggchain_proof(
        &self,
        request: &AggchainProofRequest,
    ) -> Result<AggchainProof, ProverError>;

    /// Requests an optimistic aggchain proof: the signature commits to the
    /// request, the resulting local exit root and the claims.
    async fn generate_optimistic_aggchain_proof(
        &self,
        request: &AggchainProofRequest,
        signature: &[u8],
    ) -> Result<AggchainProof, ProverError>;
}

/// The prover reports "no proof yet" with this message over the wire.
const NO_PROOF_BUILT_YET_MESSAGE: &str = "has not built any proof yet";

/// An [`AggchainProofClient`] over the proof-generation tool's `aggkit_*`
/// JSON-RPC surface.
#[derive(Debug, Clone)]
pub struct JsonRpcProverClient {
    client: alloy_rpc_client::RpcClient,
}

impl JsonRpcProverClient {
    /// Connects to the proof-generation tool at the given HTTP endpoint.
    pub fn new(url: url::Url) -> Self {
        Self { client: alloy_rpc_client::RpcClient::new_http(url) }
    }

    fn map_error(err: impl std::fmt::Display) -> ProverError {
        let message = err.to_string();
        if message.contains(NO_PROOF_BUILT_YET_MESSAGE) {
            return ProverError::NoProofBuiltYet;
        }
        ProverError::Transport(message)
    }
}

#[async_trait::async_trait]
impl AggchainProofClient for JsonRpcProverClient {
    async fn generate_aggchain_proof(
        &self,
        request: &AggchainProofRequest,
    ) -> Result<AggchainProof, ProverError> {
        self.client
            .request("aggkit_generateAggchainProof", (request,))
            .await
            .map_err(Self::map_error)
    }

    async fn generate_optimistic_aggchain_proof(
        &self,
        request: &AggchainProofRequest,
        signature: &[u8],
    ) -> Result<AggchainProof, ProverError> {
        self.client
            .request(
                "aggkit_generateOptimisticAggchainProof",
                (request, alloy_primitives::hex::encode(signature)),
            )
            .await
            .map_err(Self::map_error)
    }
}
