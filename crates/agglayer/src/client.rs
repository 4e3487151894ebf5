use crate::{Certificate, CertificateHeader, ClockConfiguration};

use alloy_primitives::B256;

/// An error returned by the agglayer services.
#[derive(Debug, thiserror::Error)]
pub enum AgglayerClientError {
    /// The transport to the agglayer failed.
    #[error("agglayer transport error: {0}")]
    Transport(String),
    /// The agglayer rejected the request.
    #[error("agglayer rejected request: {0}")]
    Rejected(String),
}

/// The client interface of the agglayer: certificate submission, node state
/// and configuration services. Request and response shapes mirror the
/// `agglayer/node/v1` package; the transport is injected so tests can run
/// against fakes.
#[async_trait::async_trait]
pub trait AgglayerClient: Send + Sync {
    /// Submits a certificate, returning the certificate id assigned by the
    /// agglayer.
    async fn send_certificate(
        &self,
        certificate: &Certificate,
    ) -> Result<B256, AgglayerClientError>;

    /// Returns the header of the certificate with the given id.
    async fn get_certificate_header(
        &self,
        certificate_id: B256,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError>;

    /// Returns the header of the latest settled certificate for the network.
    async fn get_latest_settled_certificate_header(
        &self,
        network_id: u32,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError>;

    /// Returns the header of the latest known (possibly still open)
    /// certificate for the network.
    async fn get_latest_pending_certificate_header(
        &self,
        network_id: u32,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError>;

    /// Returns the epoch clock configuration.
    async fn get_epoch_configuration(&self) -> Result<ClockConfiguration, AgglayerClientError>;
}
