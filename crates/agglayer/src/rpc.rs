use crate::{
    AgglayerClient, AgglayerClientError, Certificate, CertificateHeader, ClockConfiguration,
};

use alloy_primitives::B256;
use alloy_rpc_client::RpcClient;

/// An [`AgglayerClient`] over the agglayer node's `interop_*` JSON-RPC
/// surface.
#[derive(Debug, Clone)]
pub struct JsonRpcAgglayerClient {
    client: RpcClient,
}

impl JsonRpcAgglayerClient {
    /// Connects to the agglayer node at the given HTTP endpoint.
    pub fn new(url: url::Url) -> Self {
        Self { client: RpcClient::new_http(url) }
    }
}

fn transport_error(err: impl std::fmt::Display) -> AgglayerClientError {
    AgglayerClientError::Transport(err.to_string())
}

#[async_trait::async_trait]
impl AgglayerClient for JsonRpcAgglayerClient {
    async fn send_certificate(
        &self,
        certificate: &Certificate,
    ) -> Result<B256, AgglayerClientError> {
        tracing::debug!(target: "aggkit::agglayer", %certificate, "sending certificate");
        self.client
            .request("interop_sendCertificate", (certificate,))
            .await
            .map_err(|err| match err.as_error_resp() {
                Some(resp) => AgglayerClientError::Rejected(resp.to_string()),
                None => transport_error(err),
            })
    }

    async fn get_certificate_header(
        &self,
        certificate_id: B256,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
        self.client
            .request("interop_getCertificateHeader", (certificate_id,))
            .await
            .map_err(transport_error)
    }

    async fn get_latest_settled_certificate_header(
        &self,
        network_id: u32,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
        self.client
            .request("interop_getLatestSettledCertificateHeader", (network_id,))
            .await
            .map_err(transport_error)
    }

    async fn get_latest_pending_certificate_header(
        &self,
        network_id: u32,
    ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
        self.client
            .request("interop_getLatestPendingCertificateHeader", (network_id,))
            .await
            .map_err(transport_error)
    }

    async fn get_epoch_configuration(&self) -> Result<ClockConfiguration, AgglayerClientError> {
        self.client
            .request_noparams("interop_getEpochConfiguration")
            .await
            .map_err(transport_error)
    }
}
