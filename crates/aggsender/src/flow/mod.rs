mod base;
pub use base::BaseFlow;

mod aggchain_prover;
pub use aggchain_prover::AggchainProverFlow;

mod pessimistic;
pub use pessimistic::PessimisticFlow;

use crate::{error::AggsenderError, types::CertificateBuildParams};

use aggkit_agglayer::{Certificate, CertificateType};

#[cfg(test)]
pub(crate) fn metadata_for_tests(
    from_block: u64,
    to_block: u64,
    created_at: u64,
) -> alloy_primitives::B256 {
    base::certificate_metadata(from_block, to_block, created_at)
}

/// One certificate-building strategy: the PP path signs, the
/// aggchain-prover path fetches a proof first.
#[async_trait::async_trait]
pub trait AggsenderFlow: Send + Sync {
    /// The certificate type this flow would generate right now.
    fn certificate_type(&self) -> Result<CertificateType, AggsenderError>;

    /// Validates the stored state against the chain on startup.
    async fn check_initial_status(&self) -> Result<(), AggsenderError>;

    /// Assembles the parameters of the next certificate. `None` means there
    /// is nothing to send this tick (no new blocks, or no proof built yet).
    async fn get_certificate_build_params(
        &self,
    ) -> Result<Option<CertificateBuildParams>, AggsenderError>;

    /// Builds and signs the certificate.
    async fn build_certificate(
        &self,
        params: &CertificateBuildParams,
    ) -> Result<Certificate, AggsenderError>;
}
