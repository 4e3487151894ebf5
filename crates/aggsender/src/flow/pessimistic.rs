use crate::{
    error::AggsenderError,
    flow::{base::BaseFlow, AggsenderFlow},
    types::{BridgeQuerier, CertificateBuildParams, L1InfoTreeDataQuerier},
};

use aggkit_agglayer::{
    AggchainData, AggchainDataSignature, Certificate, CertificateType,
};
use alloy_signer::Signer;
use std::sync::Arc;

/// The pessimistic-proof flow: no external proof, the certificate carries a
/// signature of the aggsender key over the PP hash-to-sign.
pub struct PessimisticFlow<B, L> {
    base: BaseFlow<B, L>,
    certificate_signer: Arc<dyn Signer + Send + Sync>,
}

impl<B, L> std::fmt::Debug for PessimisticFlow<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PessimisticFlow").finish_non_exhaustive()
    }
}

impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> PessimisticFlow<B, L> {
    /// Returns a new instance of [`PessimisticFlow`].
    pub fn new(base: BaseFlow<B, L>, certificate_signer: Arc<dyn Signer + Send + Sync>) -> Self {
        Self { base, certificate_signer }
    }
}

#[async_trait::async_trait]
impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> AggsenderFlow for PessimisticFlow<B, L> {
    fn certificate_type(&self) -> Result<CertificateType, AggsenderError> {
        Ok(CertificateType::PessimisticProof)
    }

    async fn check_initial_status(&self) -> Result<(), AggsenderError> {
        Ok(())
    }

    async fn get_certificate_build_params(
        &self,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
        let last_sent = self.base.storage().get_last_sent_certificate_header().await?;

        if let Some(last) = &last_sent {
            if last.status.is_in_error() &&
                last.cert_type == CertificateType::PessimisticProof
            {
                tracing::info!(target: "aggkit::aggsender", id = last.id(), "re-sending the InError certificate");
                let (bridges, claims) =
                    self.base.bridges_and_claims(last.from_block, last.to_block).await?;
                let mut params = CertificateBuildParams {
                    from_block: last.from_block,
                    to_block: last.to_block,
                    retry_count: last.retry_count + 1,
                    bridges,
                    claims,
                    last_sent_certificate: Some(last.clone()),
                    created_at: last.created_at,
                    certificate_type: CertificateType::PessimisticProof,
                    aggchain_proof: None,
                    l1_info_tree_root_to_prove: Default::default(),
                    l1_info_tree_leaf_count: 0,
                };
                self.anchor_to_finalized_root(&mut params).await?;
                return Ok(Some(params));
            }
        }

        let Some(mut params) =
            self.base.build_params_internal(CertificateType::PessimisticProof).await?
        else {
            return Ok(None);
        };
        self.base.verify_build_params(&params)?;
        self.anchor_to_finalized_root(&mut params).await?;
        Ok(Some(params))
    }

    async fn build_certificate(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<Certificate, AggsenderError> {
        let mut certificate = self.base.build_certificate(params).await?;

        let hash_to_sign = certificate.pp_hash_to_sign();
        let signature = self
            .certificate_signer
            .sign_hash(&hash_to_sign)
            .await
            .map_err(|err| AggsenderError::Signer(err.to_string()))?;
        certificate.aggchain_data = Some(AggchainData::Signature(AggchainDataSignature {
            signature: signature.as_bytes().to_vec(),
        }));

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

impl<B: BridgeQuerier, L: L1InfoTreeDataQuerier> PessimisticFlow<B, L> {
    /// Selects the finalized L1 info root the claims are proven against and
    /// checks every claim belongs to it.
    async fn anchor_to_finalized_root(
        &self,
        params: &mut CertificateBuildParams,
    ) -> Result<(), AggsenderError> {
        let (_, _, root) = self.base.l1_info_querier().get_finalized_l1_info_tree_data().await?;
        self.base.check_claims_in_finalized_tree(&root, &params.claims).await?;
        params.l1_info_tree_root_to_prove = root.hash;
        params.l1_info_tree_leaf_count = root.index + 1;
        Ok(())
    }
}
