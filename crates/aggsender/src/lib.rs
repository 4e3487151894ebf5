//! The aggsender: a single-writer pipeline that, for each height, builds a
//! certificate over a contiguous L2 block range, obtains a zero-knowledge
//! aggchain proof for it when required, signs it, submits it to the agglayer
//! and tracks it to settlement. At most one certificate is open at any time.

mod block_notifier;
pub use block_notifier::{BlockNotifier, EventNewBlock};

mod epoch_notifier;
pub use epoch_notifier::{EpochEvent, EpochNotifier, EpochNotifierConfig};

mod error;
pub use error::AggsenderError;

mod flow;
pub use flow::{AggchainProverFlow, AggsenderFlow, BaseFlow, PessimisticFlow};

mod metrics;
pub use metrics::AggsenderMetrics;

pub mod prover;

mod query;
pub use query::{BridgeSyncQuerier, L1InfoTreeSyncQuerier, NoInjectedGers};

mod storage;
pub use storage::AggsenderStorage;

mod types;
pub use types::{
    BridgeQuerier, CertificateBuildParams, GerQuerier, L1InfoTreeDataQuerier,
    OptimisticModeQuerier, OptimisticSigner, StaticOptimisticModeQuerier,
};

use aggkit_agglayer::{AgglayerClient, CertificateStatus};
use aggkit_db::{CertificateInfo, StoredAggchainProof};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The status snapshot served over the internal RPC surface.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AggsenderStatus {
    /// Whether the pipeline loop is running.
    pub running: bool,
    /// The header of the last submitted certificate.
    pub last_certificate: Option<LastCertificate>,
}

/// A compact view of the last submitted certificate.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LastCertificate {
    /// The height of the certificate.
    pub height: u64,
    /// The last observed status.
    pub status: CertificateStatus,
    /// The certified block range.
    pub from_block: u64,
    /// The certified block range.
    pub to_block: u64,
}

/// The certificate pipeline scheduler. One tick per epoch notification:
/// either polls the open certificate, or builds and submits a new one.
pub struct AggSender<F, A> {
    flow: F,
    agglayer: Arc<A>,
    storage: AggsenderStorage,
    epoch_events: mpsc::Receiver<EpochEvent>,
    network_id: u32,
    metrics: AggsenderMetrics,
}

impl<F, A> std::fmt::Debug for AggSender<F, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggSender").field("network_id", &self.network_id).finish_non_exhaustive()
    }
}

impl<F: AggsenderFlow, A: AgglayerClient> AggSender<F, A> {
    /// Returns a new instance of [`AggSender`].
    pub fn new(
        flow: F,
        agglayer: Arc<A>,
        storage: AggsenderStorage,
        epoch_events: mpsc::Receiver<EpochEvent>,
        network_id: u32,
    ) -> Self {
        Self {
            flow,
            agglayer,
            storage,
            epoch_events,
            network_id,
            metrics: AggsenderMetrics::default(),
        }
    }

    /// Runs the pipeline until cancelled. Transient tick errors are logged
    /// and retried on the next epoch; invariant violations terminate the
    /// task.
    pub async fn start(mut self, ct: CancellationToken) -> Result<(), AggsenderError> {
        self.flow.check_initial_status().await?;
        self.recover_from_agglayer().await?;

        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    tracing::info!(target: "aggkit::aggsender", "stopping aggsender");
                    return Ok(());
                }
                event = self.epoch_events.recv() => {
                    let Some(event) = event else {
                        tracing::info!(target: "aggkit::aggsender", "epoch channel closed, stopping aggsender");
                        return Ok(());
                    };
                    tracing::debug!(target: "aggkit::aggsender", epoch = event.epoch, pending_blocks = event.pending_blocks, "epoch tick");
                    match self.tick().await {
                        Ok(()) => {}
                        Err(err @ AggsenderError::ModeChangedWhileOpen { .. }) => {
                            tracing::error!(target: "aggkit::aggsender", %err, "fatal aggsender error");
                            return Err(err);
                        }
                        Err(err) => {
                            tracing::error!(target: "aggkit::aggsender", %err, "tick failed, will retry next epoch");
                        }
                    }
                }
            }
        }
    }

    /// If local storage is empty but the agglayer already knows this
    /// network, adopt the remote header so heights keep chaining after a
    /// wiped database.
    async fn recover_from_agglayer(&self) -> Result<(), AggsenderError> {
        if self.storage.get_last_sent_certificate_header().await?.is_some() {
            return Ok(());
        }
        let Some(remote) =
            self.agglayer.get_latest_pending_certificate_header(self.network_id).await?
        else {
            return Ok(());
        };
        tracing::info!(
            target: "aggkit::aggsender",
            id = remote.id(),
            status = %remote.status,
            "recovering the last certificate from the agglayer"
        );
        let (from_block, to_block) = blocks_from_metadata(remote.metadata);
        self.storage
            .save_certificate_header(CertificateInfo {
                network_id: remote.network_id,
                height: remote.height,
                certificate_id: remote.certificate_id,
                status: remote.status,
                prev_local_exit_root: remote.previous_local_exit_root,
                new_local_exit_root: remote.new_local_exit_root,
                metadata: remote.metadata,
                epoch: remote.epoch_number,
                certificate_index: remote.certificate_index,
                from_block,
                to_block,
                created_at: 0,
                retry_count: 0,
                cert_type: Default::default(),
                finalized_l1_info_tree_root: None,
                l1_info_tree_leaf_count: 0,
                settlement_tx_hash: remote.settlement_tx_hash,
            })
            .await
    }

    /// One scheduler tick.
    async fn tick(&mut self) -> Result<(), AggsenderError> {
        if self.check_pending_certificate().await? {
            // a certificate is still open, keep polling.
            return Ok(());
        }

        let Some(params) = self.flow.get_certificate_build_params().await? else {
            return Ok(());
        };
        let certificate = self.flow.build_certificate(&params).await?;

        tracing::info!(
            target: "aggkit::aggsender",
            %certificate,
            from_block = params.from_block,
            to_block = params.to_block,
            retry_count = params.retry_count,
            "submitting certificate"
        );
        let certificate_id = match self.agglayer.send_certificate(&certificate).await {
            Ok(id) => id,
            Err(err) => {
                self.metrics.send_errors.increment(1);
                return Err(err.into());
            }
        };
        self.metrics.certificates_sent.increment(1);

        self.storage
            .save_certificate_header(CertificateInfo {
                network_id: self.network_id,
                height: certificate.height,
                certificate_id,
                status: CertificateStatus::Pending,
                prev_local_exit_root: Some(certificate.prev_local_exit_root),
                new_local_exit_root: certificate.new_local_exit_root,
                metadata: certificate.metadata,
                epoch: None,
                certificate_index: None,
                from_block: params.from_block,
                to_block: params.to_block,
                created_at: params.created_at,
                retry_count: params.retry_count,
                cert_type: params.certificate_type,
                finalized_l1_info_tree_root: Some(params.l1_info_tree_root_to_prove),
                l1_info_tree_leaf_count: params.l1_info_tree_leaf_count,
                settlement_tx_hash: None,
            })
            .await?;

        if let Some(proof) = &params.aggchain_proof {
            self.storage
                .save_aggchain_proof(
                    certificate.height,
                    StoredAggchainProof {
                        proof: proof.sp1_stark_proof.proof.clone(),
                        version: proof.sp1_stark_proof.version.clone(),
                        vkey: proof.sp1_stark_proof.vkey.clone(),
                        aggchain_params: proof.aggchain_params,
                        context: proof.context.clone(),
                        last_proven_block: proof.last_proven_block,
                        end_block: proof.end_block,
                        local_exit_root: proof.local_exit_root,
                        custom_chain_data: proof.custom_chain_data.clone(),
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Reconciles the last local certificate with the agglayer. Returns true
    /// while a certificate is still open.
    async fn check_pending_certificate(&self) -> Result<bool, AggsenderError> {
        let Some(local) = self.storage.get_last_sent_certificate_header().await? else {
            return Ok(false);
        };
        if local.status.is_closed() {
            return Ok(false);
        }

        // a mode flip while a certificate is open cannot be reconciled.
        let current_type = self.flow.certificate_type()?;
        if current_type != local.cert_type {
            return Err(AggsenderError::ModeChangedWhileOpen {
                open: local.cert_type,
                current: current_type,
            });
        }

        let Some(remote) = self.agglayer.get_certificate_header(local.certificate_id).await?
        else {
            tracing::warn!(target: "aggkit::aggsender", id = local.id(), "agglayer does not know the open certificate yet");
            return Ok(true);
        };

        if remote.status != local.status {
            tracing::info!(
                target: "aggkit::aggsender",
                id = local.id(),
                from = %local.status,
                to = %remote.status,
                "certificate status changed"
            );
            self.storage
                .update_status(local.height, remote.status, remote.settlement_tx_hash)
                .await?;
            match remote.status {
                CertificateStatus::Settled => {
                    self.metrics.certificates_settled.increment(1);
                    self.storage.delete_cached_proof(local.height).await?;
                }
                CertificateStatus::InError => {
                    self.metrics.certificates_in_error.increment(1);
                    if let Some(error) = &remote.error {
                        tracing::error!(target: "aggkit::aggsender", id = local.id(), %error, "certificate in error");
                    }
                }
                _ => {}
            }
        }

        Ok(remote.status.is_open())
    }

    /// The status snapshot served over the internal RPC surface.
    pub async fn status(&self) -> Result<AggsenderStatus, AggsenderError> {
        let last = self.storage.get_last_sent_certificate_header().await?;
        Ok(AggsenderStatus {
            running: true,
            last_certificate: last.map(|cert| LastCertificate {
                height: cert.height,
                status: cert.status,
                from_block: cert.from_block,
                to_block: cert.to_block,
            }),
        })
    }
}

/// Unpacks the block range out of the certificate metadata
/// (`[version | from_block be64 | offset be32 | created_at be32]`).
fn blocks_from_metadata(metadata: alloy_primitives::B256) -> (u64, u64) {
    let bytes = metadata.0;
    let from_block = u64::from_be_bytes(bytes[1..9].try_into().expect("slice of 8 bytes"));
    let offset = u32::from_be_bytes(bytes[9..13].try_into().expect("slice of 4 bytes")) as u64;
    (from_block, from_block + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::AggsenderFlow;

    use aggkit_agglayer::{
        AgglayerClientError, Certificate, CertificateHeader, CertificateType, ClockConfiguration,
    };
    use aggkit_db::test_utils::setup_test_db;
    use alloy_primitives::B256;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MockAgglayer {
        header: Mutex<Option<CertificateHeader>>,
        submitted: Mutex<Vec<Certificate>>,
    }

    #[async_trait::async_trait]
    impl AgglayerClient for MockAgglayer {
        async fn send_certificate(
            &self,
            certificate: &Certificate,
        ) -> Result<B256, AgglayerClientError> {
            self.submitted.lock().unwrap().push(certificate.clone());
            Ok(B256::repeat_byte(0x99))
        }

        async fn get_certificate_header(
            &self,
            _certificate_id: B256,
        ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
            Ok(self.header.lock().unwrap().clone())
        }

        async fn get_latest_settled_certificate_header(
            &self,
            _network_id: u32,
        ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
            Ok(None)
        }

        async fn get_latest_pending_certificate_header(
            &self,
            _network_id: u32,
        ) -> Result<Option<CertificateHeader>, AgglayerClientError> {
            Ok(None)
        }

        async fn get_epoch_configuration(&self) -> Result<ClockConfiguration, AgglayerClientError> {
            Ok(ClockConfiguration { epoch_duration: 10, genesis_block: 0 })
        }
    }

    #[derive(Debug)]
    struct MockFlow {
        cert_type: CertificateType,
        params: Option<CertificateBuildParams>,
    }

    #[async_trait::async_trait]
    impl AggsenderFlow for MockFlow {
        fn certificate_type(&self) -> Result<CertificateType, AggsenderError> {
            Ok(self.cert_type)
        }

        async fn check_initial_status(&self) -> Result<(), AggsenderError> {
            Ok(())
        }

        async fn get_certificate_build_params(
            &self,
        ) -> Result<Option<CertificateBuildParams>, AggsenderError> {
            Ok(self.params.clone())
        }

        async fn build_certificate(
            &self,
            params: &CertificateBuildParams,
        ) -> Result<Certificate, AggsenderError> {
            Ok(Certificate {
                network_id: 1,
                height: params
                    .last_sent_certificate
                    .as_ref()
                    .map(|cert| cert.height + 1)
                    .unwrap_or(0),
                new_local_exit_root: B256::repeat_byte(0x11),
                ..Default::default()
            })
        }
    }

    fn open_cert(cert_type: CertificateType) -> aggkit_db::CertificateInfo {
        aggkit_db::CertificateInfo {
            network_id: 1,
            height: 2,
            certificate_id: B256::repeat_byte(0x22),
            status: CertificateStatus::Pending,
            cert_type,
            from_block: 1,
            to_block: 9,
            ..Default::default()
        }
    }

    fn aggsender(
        flow: MockFlow,
        agglayer: Arc<MockAgglayer>,
        storage: AggsenderStorage,
    ) -> AggSender<MockFlow, MockAgglayer> {
        let (_tx, rx) = mpsc::channel(1);
        AggSender::new(flow, agglayer, storage, rx, 1)
    }

    #[tokio::test]
    async fn test_mode_change_while_open_is_fatal() {
        // Given: an open FEP certificate while the flow now generates PP.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(open_cert(CertificateType::Fep)).await.unwrap();
        let sender = aggsender(
            MockFlow { cert_type: CertificateType::PessimisticProof, params: None },
            Arc::new(MockAgglayer::default()),
            storage,
        );

        // When / Then
        let err = sender.check_pending_certificate().await.unwrap_err();
        assert!(matches!(err, AggsenderError::ModeChangedWhileOpen { .. }));
    }

    #[tokio::test]
    async fn test_remote_settlement_closes_the_certificate() {
        // Given: an open certificate the agglayer reports as settled.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(open_cert(CertificateType::Fep)).await.unwrap();
        storage.save_aggchain_proof(2, Default::default()).await.unwrap();

        let agglayer = Arc::new(MockAgglayer::default());
        *agglayer.header.lock().unwrap() = Some(CertificateHeader {
            network_id: 1,
            height: 2,
            certificate_id: B256::repeat_byte(0x22),
            new_local_exit_root: B256::repeat_byte(0x11),
            status: CertificateStatus::Settled,
            settlement_tx_hash: Some(B256::repeat_byte(0x77)),
            ..Default::default()
        });
        let sender = aggsender(
            MockFlow { cert_type: CertificateType::Fep, params: None },
            agglayer,
            storage.clone(),
        );

        // When
        let still_open = sender.check_pending_certificate().await.unwrap();

        // Then: the local header is settled, the cached proof is gone, and
        // the pipeline may build a new certificate.
        assert!(!still_open);
        let local = storage.get_certificate_by_height(2).await.unwrap().unwrap();
        assert_eq!(local.status, CertificateStatus::Settled);
        assert_eq!(local.settlement_tx_hash, Some(B256::repeat_byte(0x77)));
        let (_, proof) =
            storage.get_last_sent_certificate_header_with_proof_if_in_error().await.unwrap();
        assert!(proof.is_none());
    }

    #[tokio::test]
    async fn test_tick_submits_and_persists_a_pending_header() {
        // Given: no open certificate and params for range [1, 5].
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        let agglayer = Arc::new(MockAgglayer::default());
        let params = CertificateBuildParams {
            from_block: 1,
            to_block: 5,
            created_at: 777,
            certificate_type: CertificateType::Fep,
            ..Default::default()
        };
        let mut sender = aggsender(
            MockFlow { cert_type: CertificateType::Fep, params: Some(params) },
            agglayer.clone(),
            storage.clone(),
        );

        // When
        sender.tick().await.unwrap();

        // Then
        assert_eq!(agglayer.submitted.lock().unwrap().len(), 1);
        let header = storage.get_last_sent_certificate_header().await.unwrap().unwrap();
        assert_eq!(header.status, CertificateStatus::Pending);
        assert_eq!((header.from_block, header.to_block), (1, 5));
        assert_eq!(header.created_at, 777);
        assert_eq!(header.certificate_id, B256::repeat_byte(0x99));
    }

    #[tokio::test]
    async fn test_open_certificate_blocks_new_submissions() {
        // Given: an open certificate the agglayer still reports as pending.
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(open_cert(CertificateType::Fep)).await.unwrap();
        let agglayer = Arc::new(MockAgglayer::default());
        *agglayer.header.lock().unwrap() = Some(CertificateHeader {
            network_id: 1,
            height: 2,
            certificate_id: B256::repeat_byte(0x22),
            status: CertificateStatus::Proven,
            ..Default::default()
        });
        let params = CertificateBuildParams::default();
        let mut sender = aggsender(
            MockFlow { cert_type: CertificateType::Fep, params: Some(params) },
            agglayer.clone(),
            storage.clone(),
        );

        // When
        sender.tick().await.unwrap();

        // Then: nothing was submitted, but the observed transition
        // Pending -> Proven was recorded.
        assert!(agglayer.submitted.lock().unwrap().is_empty());
        let local = storage.get_certificate_by_height(2).await.unwrap().unwrap();
        assert_eq!(local.status, CertificateStatus::Proven);
    }

    #[test]
    fn test_metadata_round_trip() {
        let metadata = crate::flow::metadata_for_tests(100, 150, 42);
        assert_eq!(blocks_from_metadata(metadata), (100, 150));
    }
}
