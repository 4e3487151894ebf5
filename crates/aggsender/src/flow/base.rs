use crate::{
    error::AggsenderError,
    storage::AggsenderStorage,
    types::{BridgeQuerier, CertificateBuildParams, L1InfoTreeDataQuerier},
};

use aggkit_agglayer::{
    BridgeExit, Certificate, CertificateType, ClaimData, ClaimFromMainnet, ClaimFromRollup,
    ImportedBridgeExit, LeafType, MerkleProof, TokenInfo,
};
use aggkit_db::CertificateInfo;
use aggkit_primitives::{Claim, TreeRoot};
use alloy_primitives::{keccak256, B256};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

const METADATA_VERSION: u8 = 1;

pub(crate) fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Packs the certificate metadata the way the agglayer expects:
/// `[version | from_block be64 | offset be32 | created_at be32]`, zero padded.
pub(crate) fn certificate_metadata(from_block: u64, to_block: u64, created_at: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = METADATA_VERSION;
    bytes[1..9].copy_from_slice(&from_block.to_be_bytes());
    bytes[9..13].copy_from_slice(&((to_block.saturating_sub(from_block)) as u32).to_be_bytes());
    bytes[13..17].copy_from_slice(&(created_at as u32).to_be_bytes());
    B256::from(bytes)
}

/// The logic shared by every flow: range selection, consistency checks, the
/// local-exit-root fold and certificate assembly.
#[derive(Debug)]
pub struct BaseFlow<B, L> {
    storage: AggsenderStorage,
    bridge_querier: Arc<B>,
    l1_info_querier: Arc<L>,
    network_id: u32,
    start_l2_block: u64,
    max_l2_block: Option<u64>,
}

impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> BaseFlow<B, L> {
    /// Returns a new instance of [`BaseFlow`].
    pub fn new(
        storage: AggsenderStorage,
        bridge_querier: Arc<B>,
        l1_info_querier: Arc<L>,
        network_id: u32,
        start_l2_block: u64,
        max_l2_block: Option<u64>,
    ) -> Self {
        Self { storage, bridge_querier, l1_info_querier, network_id, start_l2_block, max_l2_block }
    }

    pub(crate) const fn start_l2_block(&self) -> u64 {
        self.start_l2_block
    }

    pub(crate) const fn storage(&self) -> &AggsenderStorage {
        &self.storage
    }

    pub(crate) fn l1_info_querier(&self) -> &L {
        &self.l1_info_querier
    }

    pub(crate) async fn bridges_and_claims(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<(Vec<aggkit_primitives::Bridge>, Vec<Claim>), AggsenderError> {
        self.bridge_querier.get_bridges_and_claims(from_block, to_block).await
    }

    /// Selects the next block range and queries its bridges and claims.
    /// `None` means there are no new blocks to certify.
    pub(crate) async fn build_params_internal(
        &self,
        certificate_type: CertificateType,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
        let last_sent = self.storage.get_last_sent_certificate_header().await?;
        let from_block = last_sent.as_ref().map(|cert| cert.to_block + 1).unwrap_or(0);

        let last_l2_block = self.bridge_querier.get_last_processed_block().await?;
        let to_block = match self.max_l2_block {
            Some(max) => last_l2_block.min(max),
            None => last_l2_block,
        };

        let no_new_blocks = match &last_sent {
            Some(cert) => to_block <= cert.to_block,
            None => to_block == 0 && from_block == 0 && last_l2_block == 0,
        };
        if no_new_blocks {
            tracing::debug!(target: "aggkit::aggsender", from_block, to_block, "no new blocks to certify");
            return Ok(None);
        }

        let (bridges, claims) =
            self.bridge_querier.get_bridges_and_claims(from_block, to_block).await?;

        Ok(Some(CertificateBuildParams {
            from_block,
            to_block,
            retry_count: 0,
            bridges,
            claims,
            last_sent_certificate: last_sent,
            created_at: unix_now(),
            certificate_type,
            aggchain_proof: None,
            l1_info_tree_root_to_prove: B256::ZERO,
            l1_info_tree_leaf_count: 0,
        }))
    }

    /// Sanity-checks the candidate range against the last certificate.
    pub(crate) fn verify_build_params(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<(), AggsenderError> {
        if params.to_block < params.from_block {
            return Err(AggsenderError::InvalidBlockRange(format!(
                "from {} is greater than to {}",
                params.from_block, params.to_block
            )));
        }
        if let Some(last) = &params.last_sent_certificate {
            let retry = last.status.is_in_error();
            if retry && (params.from_block, params.to_block) != (last.from_block, last.to_block) {
                return Err(AggsenderError::InvalidBlockRange(format!(
                    "retry range [{}, {}] differs from the InError certificate range [{}, {}]",
                    params.from_block, params.to_block, last.from_block, last.to_block
                )));
            }
            if !retry && params.from_block != last.to_block + 1 &&
                params.from_block != self.start_l2_block + 1
            {
                return Err(AggsenderError::InvalidBlockRange(format!(
                    "from {} leaves a gap after the last certified block {}",
                    params.from_block, last.to_block
                )));
            }
        }
        Ok(())
    }

    /// The height and previous local exit root of the certificate being
    /// built: a retry reuses the failed height, otherwise heights increase
    /// by one; height 0 starts from the empty root.
    pub(crate) fn height_and_prev_ler(last: &Option<CertificateInfo>) -> (u64, B256) {
        match last {
            None => (0, aggkit_tree::empty_root()),
            Some(cert) if cert.status.is_in_error() => (
                cert.height,
                cert.prev_local_exit_root.unwrap_or_else(aggkit_tree::empty_root),
            ),
            Some(cert) => (cert.height + 1, cert.new_local_exit_root),
        }
    }

    /// The local exit root after the certified range: the versioned root at
    /// the last bridge's deposit count, or the previous root for an empty
    /// range.
    pub(crate) async fn get_new_local_exit_root(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<B256, AggsenderError> {
        match params.bridges.last() {
            Some(bridge) => self.bridge_querier.get_exit_root_by_index(bridge.deposit_count).await,
            None => Ok(Self::height_and_prev_ler(&params.last_sent_certificate).1),
        }
    }

    /// Every claim's GER must be committed by the finalized L1 info tree on
    /// or before the selected root. A violation is a hard error: the range
    /// must not be submitted.
    pub(crate) async fn check_claims_in_finalized_tree(
        &self,
        root: &TreeRoot,
        claims: &[Claim],
    ) -> Result<(), AggsenderError> {
        for claim in claims {
            let ger = claim_global_exit_root(claim);
            let leaf = self.l1_info_querier.get_info_by_global_exit_root(ger).await?;
            let in_tree = leaf.is_some_and(|leaf| leaf.l1_info_tree_index <= root.index);
            if !in_tree {
                return Err(AggsenderError::ClaimNotInFinalizedL1InfoTree {
                    global_index: claim.global_index,
                    global_exit_root: ger,
                    root: root.hash,
                    leaf_count: root.index + 1,
                });
            }
        }
        Ok(())
    }

    /// Converts a claim to the reduced imported bridge exit shipped to the
    /// prover: bridge exit, token info and global index, no proofs.
    pub(crate) fn convert_claim_to_imported_bridge_exit(
        claim: &Claim,
    ) -> ImportedBridgeExit {
        ImportedBridgeExit {
            bridge_exit: bridge_exit_from_claim(claim),
            claim_data: None,
            global_index: claim.decoded_global_index(),
        }
    }

    /// Builds the full imported bridge exits of the certificate, with the
    /// Merkle inclusion data anchored to the selected finalized root.
    pub(crate) async fn build_imported_bridge_exits(
        &self,
        claims: &[Claim],
        root_to_prove: B256,
    ) -> Result<Vec<ImportedBridgeExit>, AggsenderError> {
        let mut exits = Vec::with_capacity(claims.len());
        for claim in claims {
            let global_index = claim.decoded_global_index();
            let ger = claim_global_exit_root(claim);
            let leaf = self
                .l1_info_querier
                .get_info_by_global_exit_root(ger)
                .await?
                .ok_or_else(|| {
                    AggsenderError::L1InfoTreeQuery(format!("no L1 info leaf for GER {ger}"))
                })?;

            let proof_ger_l1_root = MerkleProof {
                root: root_to_prove,
                proof: self
                    .l1_info_querier
                    .get_proof_from_index_to_root(leaf.l1_info_tree_index, root_to_prove)
                    .await?,
            };
            let l1_leaf = aggkit_agglayer::L1InfoTreeLeaf {
                l1_info_tree_index: leaf.l1_info_tree_index,
                rer: leaf.rollup_exit_root,
                mer: leaf.mainnet_exit_root,
                inner: aggkit_agglayer::L1InfoTreeLeafInner {
                    global_exit_root: ger,
                    block_hash: leaf.previous_block_hash,
                    timestamp: leaf.timestamp,
                },
            };

            let proof_leaf = claim
                .proof_local_exit_root
                .as_deref()
                .copied()
                .ok_or(AggsenderError::MissingClaimProof(claim.global_index))?;
            let bridge_exit = bridge_exit_from_claim(claim);

            let claim_data = if global_index.mainnet_flag {
                ClaimData::Mainnet(Box::new(ClaimFromMainnet {
                    proof_leaf_mer: MerkleProof {
                        root: leaf.mainnet_exit_root,
                        proof: proof_leaf,
                    },
                    proof_ger_l1_root,
                    l1_leaf,
                }))
            } else {
                let proof_ler_rer = claim
                    .proof_rollup_exit_root
                    .as_deref()
                    .copied()
                    .ok_or(AggsenderError::MissingClaimProof(claim.global_index))?;
                // the origin local exit root is not stored anywhere locally,
                // recompute it by folding the exit through its own proof.
                let origin_local_exit_root = aggkit_tree::compute_root_from_proof(
                    bridge_exit.hash(),
                    global_index.leaf_index,
                    &proof_leaf,
                );
                ClaimData::Rollup(Box::new(ClaimFromRollup {
                    proof_leaf_ler: MerkleProof {
                        root: origin_local_exit_root,
                        proof: proof_leaf,
                    },
                    proof_ler_rer: MerkleProof {
                        root: leaf.rollup_exit_root,
                        proof: proof_ler_rer,
                    },
                    proof_ger_l1_root,
                    l1_leaf,
                }))
            };

            exits.push(ImportedBridgeExit {
                bridge_exit,
                claim_data: Some(claim_data),
                global_index,
            });
        }
        Ok(exits)
    }

    /// Assembles the unsigned certificate: range fold, height chaining and
    /// imported bridge exits.
    pub(crate) async fn build_certificate(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<Certificate, AggsenderError> {
        let (height, prev_local_exit_root) =
            Self::height_and_prev_ler(&params.last_sent_certificate);
        let new_local_exit_root = self.get_new_local_exit_root(params).await?;

        let bridge_exits = params.bridges.iter().map(bridge_exit_from_bridge).collect();
        let imported_bridge_exits = self
            .build_imported_bridge_exits(&params.claims, params.l1_info_tree_root_to_prove)
            .await?;

        Ok(Certificate {
            network_id: self.network_id,
            height,
            prev_local_exit_root,
            new_local_exit_root,
            bridge_exits,
            imported_bridge_exits,
            metadata: certificate_metadata(params.from_block, params.to_block, params.created_at),
            custom_chain_data: Vec::new(),
            aggchain_data: None,
            l1_info_tree_leaf_count: params.l1_info_tree_leaf_count,
        })
    }
}

fn claim_global_exit_root(claim: &Claim) -> B256 {
    if claim.global_exit_root != B256::ZERO {
        return claim.global_exit_root;
    }
    keccak256(
        [claim.mainnet_exit_root.as_slice(), claim.rollup_exit_root.as_slice()].concat(),
    )
}

fn bridge_exit_from_bridge(bridge: &aggkit_primitives::Bridge) -> BridgeExit {
    BridgeExit {
        leaf_type: LeafType::from_u8(bridge.leaf_type),
        token_info: TokenInfo {
            origin_network: bridge.origin_network,
            origin_token_address: bridge.origin_address,
        },
        destination_network: bridge.destination_network,
        destination_address: bridge.destination_address,
        amount: bridge.amount,
        metadata: bridge.metadata.clone(),
    }
}

fn bridge_exit_from_claim(claim: &Claim) -> BridgeExit {
    BridgeExit {
        leaf_type: LeafType::Asset,
        token_info: TokenInfo {
            origin_network: claim.origin_network,
            origin_token_address: claim.origin_address,
        },
        destination_network: claim.destination_network,
        destination_address: claim.destination_address,
        amount: claim.amount,
        metadata: claim.metadata.clone(),
    }
}
