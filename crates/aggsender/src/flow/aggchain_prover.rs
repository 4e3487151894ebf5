use crate::{
    error::AggsenderError,
    flow::{base::BaseFlow, AggsenderFlow},
    prover::{AggchainProof, AggchainProofClient, AggchainProofRequest, ProverError, Sp1StarkProof},
    types::{
        BridgeQuerier, CertificateBuildParams, GerQuerier, L1InfoTreeDataQuerier,
        OptimisticModeQuerier, OptimisticSigner,
    },
};

use aggkit_agglayer::{
    AggchainData, AggchainDataProof, Certificate, CertificateType, ImportedBridgeExitWithBlockNumber,
    MerkleProof,
};
use aggkit_db::{CertificateInfo, StoredAggchainProof};
use aggkit_primitives::TreeRoot;
use alloy_signer::Signer;
use std::sync::Arc;

/// The FEP / optimistic flow: obtains an aggchain proof from the external
/// prover before building the certificate. An `InError` certificate of the
/// same type is re-sent with the identical range, reusing the cached proof
/// when one survives.
pub struct AggchainProverFlow<B, L> {
    base: BaseFlow<B, L>,
    prover: Arc<dyn AggchainProofClient>,
    ger_querier: Arc<dyn GerQuerier>,
    certificate_signer: Arc<dyn Signer + Send + Sync>,
    optimistic_mode_querier: Arc<dyn OptimisticModeQuerier>,
    optimistic_signer: Arc<dyn OptimisticSigner>,
}

impl<B, L> std::fmt::Debug for AggchainProverFlow<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggchainProverFlow").finish_non_exhaustive()
    }
}

impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> AggchainProverFlow<B, L> {
    /// Returns a new instance of [`AggchainProverFlow`].
    pub fn new(
        base: BaseFlow<B, L>,
        prover: Arc<dyn AggchainProofClient>,
        ger_querier: Arc<dyn GerQuerier>,
        certificate_signer: Arc<dyn Signer + Send + Sync>,
        optimistic_mode_querier: Arc<dyn OptimisticModeQuerier>,
        optimistic_signer: Arc<dyn OptimisticSigner>,
    ) -> Self {
        Self {
            base,
            prover,
            ger_querier,
            certificate_signer,
            optimistic_mode_querier,
            optimistic_signer,
        }
    }

    /// The last block already proven before the candidate range.
    fn last_proven_block(&self, from_block: u64, last: Option<&CertificateInfo>) -> u64 {
        let start = self.base.start_l2_block();
        if from_block == 0 {
            return start;
        }
        if last.is_some_and(|cert| cert.to_block < start) {
            // the previous certificate settled on the PP path, below the FEP
            // starting block.
            return start;
        }
        if from_block - 1 < start {
            return start;
        }
        from_block - 1
    }

    /// Verifies the params and drives the prover call. `None` means the
    /// prover has not built a proof covering the range yet.
    async fn verify_and_generate_proof(
        &self,
        mut params: CertificateBuildParams,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
        self.base.verify_build_params(&params)?;

        let last_proven_block =
            self.last_proven_block(params.from_block, params.last_sent_certificate.as_ref());

        let (proof, root) = match self
            .generate_aggchain_proof(last_proven_block, params.to_block, &params)
            .await
        {
            Ok(result) => result,
            Err(AggsenderError::Prover(ProverError::NoProofBuiltYet)) => {
                tracing::info!(
                    target: "aggkit::aggsender",
                    last_proven_block,
                    max_end_block = params.to_block,
                    "no proof built yet, skipping the tick"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            target: "aggkit::aggsender",
            last_proven_block,
            requested_end_block = params.to_block,
            end_block = proof.end_block,
            proof_len = proof.sp1_stark_proof.proof.len(),
            "fetched aggchain proof"
        );

        // every claim proof must anchor to the same root the prover used.
        params.l1_info_tree_root_to_prove = root.hash;
        params.l1_info_tree_leaf_count = root.index + 1;

        // the prover may prove less than requested: shrink the range and
        // drop the bridges and claims past the proven end.
        let requested_to_block = params.to_block;
        let end_block = proof.end_block;
        params.aggchain_proof = Some(proof);
        if requested_to_block != end_block {
            let from_block = params.from_block;
            params = params.range(from_block, end_block)?;
        }
        Ok(Some(params))
    }

    /// Fetches the finalized L1 info tree data, checks the claims against
    /// it, and calls the prover.
    async fn generate_aggchain_proof(
        &self,
        last_proven_block: u64,
        to_block: u64,
        params: &CertificateBuildParams,
    ) -> Result<(AggchainProof, TreeRoot), AggsenderError> {
        let (proof, leaf, root) =
            self.base.l1_info_querier().get_finalized_l1_info_tree_data().await?;
        self.base.check_claims_in_finalized_tree(&root, &params.claims).await?;

        let from_block = last_proven_block + 1;
        let injected_gers =
            self.ger_querier.get_injected_gers_proofs(&root, from_block, to_block).await?;

        let imported_bridge_exits = params
            .claims
            .iter()
            .map(|claim| ImportedBridgeExitWithBlockNumber {
                block_number: claim.block_num,
                imported_bridge_exit: BaseFlow::<B, L>::convert_claim_to_imported_bridge_exit(
                    claim,
                ),
            })
            .collect();

        let request = AggchainProofRequest {
            last_proven_block,
            requested_end_block: to_block,
            l1_info_tree_root_hash: root.hash,
            l1_info_tree_leaf: aggkit_agglayer::L1InfoTreeLeaf {
                l1_info_tree_index: leaf.l1_info_tree_index,
                rer: leaf.rollup_exit_root,
                mer: leaf.mainnet_exit_root,
                inner: aggkit_agglayer::L1InfoTreeLeafInner {
                    global_exit_root: leaf.global_exit_root(),
                    block_hash: leaf.previous_block_hash,
                    timestamp: leaf.timestamp,
                },
            },
            l1_info_tree_merkle_proof: MerkleProof { root: root.hash, proof },
            ger_leaves_with_block_number: injected_gers,
            imported_bridge_exits_with_block_number: imported_bridge_exits,
        };

        let optimistic = params.certificate_type == CertificateType::Optimistic;
        tracing::info!(
            target: "aggkit::aggsender",
            last_proven_block,
            max_end_block = to_block,
            optimistic,
            "requesting aggchain proof"
        );
        let proof = if optimistic {
            let new_local_exit_root = self.base.get_new_local_exit_root(params).await?;
            let signature = self
                .optimistic_signer
                .sign(&request, new_local_exit_root, &params.claims)
                .await?;
            self.prover.generate_optimistic_aggchain_proof(&request, &signature).await?
        } else {
            self.prover.generate_aggchain_proof(&request).await?
        };

        Ok((proof, root))
    }
}

#[async_trait::async_trait]
impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> AggsenderFlow for AggchainProverFlow<B, L> {
    fn certificate_type(&self) -> Result<CertificateType, AggsenderError> {
        if self.optimistic_mode_querier.is_optimistic_mode_on()? {
            Ok(CertificateType::Optimistic)
        } else {
            Ok(CertificateType::Fep)
        }
    }

    async fn check_initial_status(&self) -> Result<(), AggsenderError> {
        let last = self.base.storage().get_last_sent_certificate_header().await?;
        if let Some(last) = last {
            if last.to_block < self.base.start_l2_block() {
                tracing::warn!(
                    target: "aggkit::aggsender",
                    last_to_block = last.to_block,
                    start_l2_block = self.base.start_l2_block(),
                    "last certificate ends before the FEP starting block"
                );
            }
        }
        Ok(())
    }

    async fn get_certificate_build_params(
        &self,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
        let (last_sent, cached_proof) = self
            .base
            .storage()
            .get_last_sent_certificate_header_with_proof_if_in_error()
            .await?;
        let certificate_type = self.certificate_type()?;

        if let Some(last) = &last_sent {
            if last.status.is_in_error() && last.cert_type == certificate_type {
                tracing::info!(target: "aggkit::aggsender", id = last.id(), "re-sending the InError certificate");
                return self.retry_in_error_certificate(last, cached_proof, certificate_type).await;
            }
            if last.status.is_in_error() {
                tracing::warn!(
                    target: "aggkit::aggsender",
                    last_type = %last.cert_type,
                    current_type = %certificate_type,
                    "next certificate is a retry but its type changed, generating a new one"
                );
            }
        }

        let Some(mut params) = self.base.build_params_internal(certificate_type).await? else {
            return Ok(None);
        };

        let last_proven_block =
            self.last_proven_block(params.from_block, params.last_sent_certificate.as_ref());
        if params.from_block != last_proven_block + 1 {
            tracing::info!(
                target: "aggkit::aggsender",
                from_block = params.from_block,
                adjusted = last_proven_block + 1,
                "aligning the certificate start with the last proven block"
            );
            params.from_block = last_proven_block + 1;
        }

        self.verify_and_generate_proof(params).await
    }

    async fn build_certificate(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<Certificate, AggsenderError> {
        let mut certificate = self.base.build_certificate(params).await?;

        let proof = params.aggchain_proof.as_ref().ok_or_else(|| {
            AggsenderError::InvalidBlockRange("aggchain proof missing from build params".into())
        })?;

        // the fold over the bridge exits must agree with the prover.
        if certificate.new_local_exit_root != proof.local_exit_root {
            return Err(AggsenderError::LocalExitRootMismatch {
                local: certificate.new_local_exit_root,
                prover: proof.local_exit_root,
            });
        }

        certificate.custom_chain_data = proof.custom_chain_data.clone();
        let mut aggchain_data = AggchainDataProof {
            proof: proof.sp1_stark_proof.proof.clone(),
            version: proof.sp1_stark_proof.version.clone(),
            vkey: proof.sp1_stark_proof.vkey.clone(),
            aggchain_params: proof.aggchain_params,
            context: proof.context.clone(),
            signature: Vec::new(),
        };
        certificate.aggchain_data = Some(AggchainData::Proof(aggchain_data.clone()));

        let hash_to_sign = certificate.fep_hash_to_sign();
        let signature = self
            .certificate_signer
            .sign_hash(&hash_to_sign)
            .await
            .map_err(|err| AggsenderError::Signer(err.to_string()))?;
        aggchain_data.signature = signature.as_bytes().to_vec();
        certificate.aggchain_data = Some(AggchainData::Proof(aggchain_data));

        tracing::info!(
            target: "aggkit::aggsender",
            height = certificate.height,
            new_local_exit_root = %certificate.new_local_exit_root,
            hash_signed = %hash_to_sign,
            "signed certificate"
        );
        Ok(certificate)
    }
}

impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> AggchainProverFlow<B, L> {
    async fn retry_in_error_certificate(
        &self,
        last: &CertificateInfo,
        cached_proof: Option<StoredAggchainProof>,
        certificate_type: CertificateType,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
        let (from_block, to_block) = (last.from_block, last.to_block);
        let last_proven_block = self.last_proven_block(from_block, Some(last));
        if from_block != last_proven_block + 1 {
            tracing::warn!(
                target: "aggkit::aggsender",
                from_block,
                last_proven_block,
                "InError certificate start does not align with the last proven block"
            );
        }

        let (bridges, claims) = self
            .base
            .bridges_and_claims(from_block, to_block)
            .await?;

        let mut params = CertificateBuildParams {
            from_block,
            to_block,
            retry_count: last.retry_count + 1,
            bridges,
            claims,
            last_sent_certificate: Some(last.clone()),
            created_at: last.created_at,
            certificate_type,
            aggchain_proof: None,
            l1_info_tree_root_to_prove: Default::default(),
            l1_info_tree_leaf_count: 0,
        };

        let Some(cached) = cached_proof else {
            // the proof cache can be lost (e.g. a wiped database recovered
            // from the agglayer); query the prover again.
            return self.verify_and_generate_proof(params).await;
        };

        params.aggchain_proof = Some(AggchainProof {
            sp1_stark_proof: Sp1StarkProof {
                proof: cached.proof,
                version: cached.version,
                vkey: cached.vkey,
            },
            last_proven_block: cached.last_proven_block,
            end_block: cached.end_block,
            local_exit_root: cached.local_exit_root,
            aggchain_params: cached.aggchain_params,
            context: cached.context,
            custom_chain_data: cached.custom_chain_data,
        });
        params.l1_info_tree_root_to_prove = last.finalized_l1_info_tree_root.unwrap_or_default();
        params.l1_info_tree_leaf_count = last.l1_info_tree_leaf_count;
        Ok(Some(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        storage::AggsenderStorage,
        types::StaticOptimisticModeQuerier,
    };

    use aggkit_agglayer::CertificateStatus;
    use aggkit_db::test_utils::setup_test_db;
    use aggkit_primitives::{Bridge, Claim, GlobalIndex, L1InfoTreeLeaf};
    use alloy_primitives::{B256, U256};
    use alloy_signer_local::PrivateKeySigner;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MockBridgeQuerier {
        bridges: Vec<Bridge>,
        claims: Vec<Claim>,
        last_block: u64,
    }

    #[async_trait::async_trait]
    impl crate::types::BridgeQuerier for MockBridgeQuerier {
        async fn get_bridges_and_claims(
            &self,
            from_block: u64,
            to_block: u64,
        ) -> Result<(Vec<Bridge>, Vec<Claim>), AggsenderError> {
            let bridges = self
                .bridges
                .iter()
                .filter(|b| b.block_num >= from_block && b.block_num <= to_block)
                .cloned()
                .collect();
            let claims = self
                .claims
                .iter()
                .filter(|c| c.block_num >= from_block && c.block_num <= to_block)
                .cloned()
                .collect();
            Ok((bridges, claims))
        }

        async fn get_last_processed_block(&self) -> Result<u64, AggsenderError> {
            Ok(self.last_block)
        }

        async fn get_exit_root_by_index(&self, index: u32) -> Result<B256, AggsenderError> {
            Ok(B256::repeat_byte(0x40 + index as u8))
        }
    }

    #[derive(Debug, Default)]
    struct MockL1InfoQuerier;

    #[async_trait::async_trait]
    impl crate::types::L1InfoTreeDataQuerier for MockL1InfoQuerier {
        async fn get_finalized_l1_info_tree_data(
            &self,
        ) -> Result<(aggkit_tree::Proof, L1InfoTreeLeaf, TreeRoot), AggsenderError> {
            let leaf = L1InfoTreeLeaf { l1_info_tree_index: 7, ..Default::default() };
            let root = TreeRoot { hash: B256::repeat_byte(0xf0), index: 7, ..Default::default() };
            Ok((aggkit_tree::empty_proof(), leaf, root))
        }

        async fn get_info_by_global_exit_root(
            &self,
            _ger: B256,
        ) -> Result<Option<L1InfoTreeLeaf>, AggsenderError> {
            Ok(Some(L1InfoTreeLeaf { l1_info_tree_index: 3, ..Default::default() }))
        }

        async fn get_proof_from_index_to_root(
            &self,
            _index: u32,
            _root: B256,
        ) -> Result<aggkit_tree::Proof, AggsenderError> {
            Ok(aggkit_tree::empty_proof())
        }

        async fn get_rollup_exit_proof(
            &self,
            _network_id: u32,
            _root: B256,
        ) -> Result<aggkit_tree::Proof, AggsenderError> {
            Ok(aggkit_tree::empty_proof())
        }
    }

    #[derive(Debug)]
    struct MockProver {
        end_block: u64,
        response: Option<ProverError>,
        requests: Mutex<Vec<AggchainProofRequest>>,
    }

    impl MockProver {
        fn returning_end_block(end_block: u64) -> Self {
            Self { end_block, response: None, requests: Mutex::new(vec![]) }
        }

        fn no_proof_yet() -> Self {
            Self {
                end_block: 0,
                response: Some(ProverError::NoProofBuiltYet),
                requests: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait::async_trait]
    impl AggchainProofClient for MockProver {
        async fn generate_aggchain_proof(
            &self,
            request: &AggchainProofRequest,
        ) -> Result<AggchainProof, ProverError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(err) = &self.response {
                return Err(match err {
                    ProverError::NoProofBuiltYet => ProverError::NoProofBuiltYet,
                    ProverError::Transport(msg) => ProverError::Transport(msg.clone()),
                    ProverError::Rejected(msg) => ProverError::Rejected(msg.clone()),
                });
            }
            Ok(AggchainProof {
                sp1_stark_proof: Sp1StarkProof {
                    proof: vec![0xaa; 16],
                    version: "v1".into(),
                    vkey: vec![0xbb; 8],
                },
                last_proven_block: request.last_proven_block,
                end_block: self.end_block,
                local_exit_root: B256::repeat_byte(0x41),
                aggchain_params: B256::repeat_byte(0x42),
                context: Default::default(),
                custom_chain_data: vec![],
            })
        }

        async fn generate_optimistic_aggchain_proof(
            &self,
            request: &AggchainProofRequest,
            _signature: &[u8],
        ) -> Result<AggchainProof, ProverError> {
            self.generate_aggchain_proof(request).await
        }
    }

    #[derive(Debug)]
    struct NopOptimisticSigner;

    #[async_trait::async_trait]
    impl crate::types::OptimisticSigner for NopOptimisticSigner {
        async fn sign(
            &self,
            _request: &AggchainProofRequest,
            _new_local_exit_root: B256,
            _claims: &[Claim],
        ) -> Result<Vec<u8>, AggsenderError> {
            Ok(vec![0xcc; 65])
        }
    }

    fn bridge(block_num: u64, deposit_count: u32) -> Bridge {
        Bridge { block_num, deposit_count, amount: U256::from(1u64), ..Default::default() }
    }

    fn claim(block_num: u64) -> Claim {
        Claim {
            block_num,
            global_index: GlobalIndex::new(true, 0, 1).encode(),
            mainnet_exit_root: B256::repeat_byte(0x51),
            rollup_exit_root: B256::repeat_byte(0x52),
            proof_local_exit_root: Some(Box::new([B256::ZERO; 32])),
            proof_rollup_exit_root: Some(Box::new([B256::ZERO; 32])),
            ..Default::default()
        }
    }

    fn settled_cert(height: u64, to_block: u64) -> CertificateInfo {
        CertificateInfo {
            network_id: 1,
            height,
            status: CertificateStatus::Settled,
            new_local_exit_root: B256::repeat_byte(0x30),
            from_block: 1,
            to_block,
            created_at: 12345,
            cert_type: CertificateType::Fep,
            ..Default::default()
        }
    }

    async fn flow(
        bridge_querier: MockBridgeQuerier,
        prover: MockProver,
        storage: AggsenderStorage,
    ) -> AggchainProverFlow<MockBridgeQuerier, MockL1InfoQuerier> {
        let base = BaseFlow::new(
            storage,
            Arc::new(bridge_querier),
            Arc::new(MockL1InfoQuerier),
            1,
            0,
            None,
        );
        AggchainProverFlow::new(
            base,
            Arc::new(prover),
            Arc::new(crate::query::NoInjectedGers),
            Arc::new(PrivateKeySigner::random()),
            Arc::new(StaticOptimisticModeQuerier(false)),
            Arc::new(NopOptimisticSigner),
        )
    }

    #[tokio::test]
    async fn test_prover_shrinks_the_range() {
        // Given: last settled certificate up to block 5, L2 tip at 10,
        // bridges at 6 and 10, a claim at 9, prover proves up to 8.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(settled_cert(3, 5)).await.unwrap();
        let bridges = MockBridgeQuerier {
            bridges: vec![bridge(6, 0), bridge(10, 1)],
            claims: vec![claim(9)],
            last_block: 10,
        };
        let flow = flow(bridges, MockProver::returning_end_block(8), storage).await;

        // When
        let params = flow.get_certificate_build_params().await.unwrap().unwrap();

        // Then: the certificate covers [6, 8] and everything past the proven
        // end is excluded.
        assert_eq!(params.from_block, 6);
        assert_eq!(params.to_block, 8);
        assert_eq!(params.bridges.iter().map(|b| b.block_num).collect::<Vec<_>>(), vec![6]);
        assert!(params.claims.is_empty());
        assert_eq!(params.l1_info_tree_root_to_prove, B256::repeat_byte(0xf0));
        assert_eq!(params.l1_info_tree_leaf_count, 8);
    }

    #[tokio::test]
    async fn test_in_error_certificate_is_resent_with_identical_range() {
        // Given: an InError FEP certificate over [1, 10] without a cached
        // proof.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        let mut cert = settled_cert(4, 10);
        cert.status = CertificateStatus::InError;
        cert.retry_count = 2;
        storage.save_certificate_header(cert).await.unwrap();

        let bridges = MockBridgeQuerier {
            bridges: vec![bridge(3, 0)],
            claims: vec![],
            last_block: 20,
        };
        let prover = MockProver::returning_end_block(10);
        let flow = flow(bridges, prover, storage).await;

        // When
        let params = flow.get_certificate_build_params().await.unwrap().unwrap();

        // Then: identical range and created_at, retry count incremented,
        // and the prover was asked again.
        assert_eq!((params.from_block, params.to_block), (1, 10));
        assert_eq!(params.retry_count, 3);
        assert_eq!(params.created_at, 12345);
        assert!(params.aggchain_proof.is_some());
    }

    #[tokio::test]
    async fn test_cached_proof_skips_the_prover() {
        // Given: an InError FEP certificate with a cached proof.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        let mut cert = settled_cert(4, 10);
        cert.status = CertificateStatus::InError;
        cert.finalized_l1_info_tree_root = Some(B256::repeat_byte(0x61));
        cert.l1_info_tree_leaf_count = 9;
        storage.save_certificate_header(cert).await.unwrap();
        storage
            .save_aggchain_proof(
                4,
                StoredAggchainProof {
                    proof: vec![1],
                    version: "v1".into(),
                    end_block: 10,
                    local_exit_root: B256::repeat_byte(0x41),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let prover = MockProver::returning_end_block(10);
        let flow = flow(MockBridgeQuerier::default(), prover, storage).await;

        // When
        let params = flow.get_certificate_build_params().await.unwrap().unwrap();

        // Then: the cached proof is reused and the prover is never called.
        assert_eq!(params.aggchain_proof.as_ref().unwrap().sp1_stark_proof.proof, vec![1]);
        assert_eq!(params.l1_info_tree_root_to_prove, B256::repeat_byte(0x61));
        assert_eq!(params.l1_info_tree_leaf_count, 9);
    }

    #[tokio::test]
    async fn test_no_proof_built_yet_skips_the_tick() {
        // Given
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        let bridges = MockBridgeQuerier {
            bridges: vec![bridge(2, 0)],
            claims: vec![],
            last_block: 5,
        };
        let flow = flow(bridges, MockProver::no_proof_yet(), storage).await;

        // When / Then: nothing to build this tick, no error.
        assert!(flow.get_certificate_build_params().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_build_certificate_checks_prover_local_exit_root() {
        // Given: a prover returning a local exit root that matches the fold
        // at deposit count 1.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        let bridges = MockBridgeQuerier {
            bridges: vec![bridge(2, 0), bridge(3, 1)],
            claims: vec![],
            last_block: 5,
        };
        let flow = flow(bridges, MockProver::returning_end_block(5), storage).await;

        let params = flow.get_certificate_build_params().await.unwrap().unwrap();
        let certificate = flow.build_certificate(&params).await.unwrap();

        // Then: height 0 starts from the empty root, and the aggchain data
        // carries the proof plus a 65-byte signature.
        assert_eq!(certificate.height, 0);
        assert_eq!(certificate.prev_local_exit_root, aggkit_tree::empty_root());
        assert_eq!(certificate.new_local_exit_root, B256::repeat_byte(0x41));
        match certificate.aggchain_data.as_ref().unwrap() {
            AggchainData::Proof(data) => {
                assert_eq!(data.proof, vec![0xaa; 16]);
                assert_eq!(data.signature.len(), 65);
            }
            AggchainData::Signature(_) => panic!("expected proof aggchain data"),
        }
    }

    #[tokio::test]
    async fn test_settled_chain_advances_height_and_chains_lers() {
        // For every settled certificate, the next height is previous + 1 and
        // prev LER chains to the previous new LER.
        let (height, prev) = BaseFlow::<MockBridgeQuerier, MockL1InfoQuerier>::height_and_prev_ler(
            &Some(settled_cert(6, 70)),
        );
        assert_eq!(height, 7);
        assert_eq!(prev, B256::repeat_byte(0x30));

        let (height, prev) = BaseFlow::<MockBridgeQuerier, MockL1InfoQuerier>::height_and_prev_ler(
            &None,
        );
        assert_eq!(height, 0);
        assert_eq!(prev, aggkit_tree::empty_root());

        let mut in_error = settled_cert(6, 70);
        in_error.status = CertificateStatus::InError;
        in_error.prev_local_exit_root = Some(B256::repeat_byte(0x29));
        let (height, prev) = BaseFlow::<MockBridgeQuerier, MockL1InfoQuerier>::height_and_prev_ler(
            &Some(in_error),
        );
        assert_eq!(height, 6);
        assert_eq!(prev, B256::repeat_byte(0x29));
    }
}
