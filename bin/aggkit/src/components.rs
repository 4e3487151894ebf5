//! Component wiring: builds the selected long-running tasks and supervises
//! them until shutdown.

use crate::config::{AggsenderMode, Config};
use crate::RunArgs;

use aggkit_agglayer::{AgglayerClient, JsonRpcAgglayerClient};
use aggkit_aggsender::{
    prover::JsonRpcProverClient, AggSender, AggchainProverFlow, AggsenderStorage, BaseFlow,
    BlockNotifier, BridgeSyncQuerier, EpochNotifier, EpochNotifierConfig, L1InfoTreeSyncQuerier,
    NoInjectedGers, PessimisticFlow, StaticOptimisticModeQuerier,
};
use aggkit_bridge_service::BridgeService;
use aggkit_bridge_sync::{BridgeSync, BridgeSyncConfig};
use aggkit_client::BasicClient;
use aggkit_l1info_tree_sync::{L1InfoTreeSync, L1InfoTreeSyncConfig};
use aggkit_reorg_detector::ReorgDetector;
use aggkit_sync::RetryHandler;
use alloy_provider::RootProvider;
use alloy_signer_local::PrivateKeySigner;
use clap::ValueEnum;
use eyre::{eyre, Context, OptionExt};
use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The runnable components of the node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Component {
    /// GER injection into the L2. Not available in this build.
    Aggoracle,
    /// The certificate pipeline.
    Aggsender,
    /// The bridge query service plus both bridge syncers.
    Bridge,
    /// The standalone proof-generation tool. Not available in this build.
    Aggchainproofgen,
    /// The L1 info tree syncer.
    #[value(name = "l1infotreesync")]
    L1InfoTreeSync,
    /// The L1 bridge syncer.
    #[value(name = "bridgel1sync")]
    BridgeL1Sync,
    /// The L2 bridge syncer.
    #[value(name = "bridgel2sync")]
    BridgeL2Sync,
    /// The last-GER syncer. Not available in this build.
    #[value(name = "lastgersync")]
    LastGerSync,
    /// The L1 reorg detector.
    #[value(name = "reorgdetectorl1")]
    ReorgDetectorL1,
    /// The L2 reorg detector.
    #[value(name = "reorgdetectorl2")]
    ReorgDetectorL2,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aggoracle => "aggoracle",
            Self::Aggsender => "aggsender",
            Self::Bridge => "bridge",
            Self::Aggchainproofgen => "aggchainproofgen",
            Self::L1InfoTreeSync => "l1infotreesync",
            Self::BridgeL1Sync => "bridgel1sync",
            Self::BridgeL2Sync => "bridgel2sync",
            Self::LastGerSync => "lastgersync",
            Self::ReorgDetectorL1 => "reorgdetectorl1",
            Self::ReorgDetectorL2 => "reorgdetectorl2",
        };
        f.write_str(name)
    }
}

type Client = BasicClient<RootProvider>;

fn client(url: &str) -> eyre::Result<Arc<Client>> {
    let url: url::Url = url.parse().wrap_err_with(|| format!("invalid RPC url: {url}"))?;
    Ok(Arc::new(BasicClient::new(RootProvider::new_http(url))))
}

fn retry(period_secs: u64, max_attempts: u32) -> RetryHandler {
    RetryHandler {
        retry_after_error_period: Duration::from_secs(period_secs),
        max_retry_attempts_after_error: max_attempts,
    }
}

/// Runs the selected components until a shutdown signal or a fatal error.
pub async fn run(args: RunArgs) -> eyre::Result<()> {
    let config = crate::config::load(&args.cfg)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Some(dir) = &args.save_config_path {
        std::fs::create_dir_all(dir)?;
        let rendered = toml::to_string_pretty(&config)?;
        std::fs::write(dir.join("aggkit-config.toml"), rendered)?;
    }
    if args.disable_default_config_vars {
        tracing::warn!(target: "aggkit", "--disable-default-config-vars is set, missing fields will not fall back to defaults in a future release");
    }
    if args.allow_deprecated_fields {
        tracing::warn!(target: "aggkit", "--allow-deprecated-fields is set, deprecated configuration fields are tolerated");
    }

    let mut components = args.components.clone();
    for component in &components {
        if matches!(
            component,
            Component::Aggoracle | Component::Aggchainproofgen | Component::LastGerSync
        ) {
            return Err(eyre!("component {component} is not available in this build"));
        }
    }
    // `bridge` implies both bridge syncers.
    if components.contains(&Component::Bridge) {
        for implied in [Component::BridgeL1Sync, Component::BridgeL2Sync] {
            if !components.contains(&implied) {
                components.push(implied);
            }
        }
    }

    tracing::info!(target: "aggkit", components = ?components.iter().map(ToString::to_string).collect::<Vec<_>>(), "starting aggkit");

    let ct = CancellationToken::new();
    let mut tasks: JoinSet<eyre::Result<()>> = JoinSet::new();

    let l1_client = client(&config.l1_url)?;
    let l2_client = client(&config.l2_url)?;

    // the reorg detectors come first, every syncer subscribes to one.
    let reorg_detector_l1 = Arc::new(ReorgDetector::new(
        l1_client.clone(),
        Duration::from_secs(config.reorg_detector.l1_check_interval_secs),
        config.reorg_detector.finality,
    ));
    let reorg_detector_l2 = Arc::new(ReorgDetector::new(
        l2_client.clone(),
        Duration::from_secs(config.reorg_detector.l2_check_interval_secs),
        config.reorg_detector.finality,
    ));
    if components.contains(&Component::ReorgDetectorL1) {
        let task_ct = ct.clone();
        let detector = reorg_detector_l1.clone();
        tasks.spawn(async move {
            detector.start(task_ct).await;
            Ok(())
        });
    }
    if components.contains(&Component::ReorgDetectorL2) {
        let task_ct = ct.clone();
        let detector = reorg_detector_l2.clone();
        tasks.spawn(async move {
            detector.start(task_ct).await;
            Ok(())
        });
    }

    // syncers.
    let l1_info_tree = if components.contains(&Component::L1InfoTreeSync) {
        let sync_config = &config.l1_info_tree_sync;
        let syncer = L1InfoTreeSync::new(
            L1InfoTreeSyncConfig {
                db_path: format!("sqlite://{}?mode=rwc", sync_config.db_path),
                global_exit_root_addr: sync_config.global_exit_root_addr,
                rollup_manager_addr: sync_config.rollup_manager_addr,
                sync_block_chunk_size: sync_config.sync_block_chunk_size,
                block_finality: sync_config.block_finality,
                finalized_block_type: sync_config.finalized_block_type,
                wait_for_new_blocks_period: Duration::from_secs(
                    sync_config.wait_for_new_blocks_period_secs,
                ),
                retry: retry(
                    sync_config.retry_after_error_period_secs,
                    sync_config.max_retry_attempts_after_error,
                ),
                require_storage_content_compatibility: sync_config
                    .require_storage_content_compatibility,
            },
            l1_client.clone(),
            reorg_detector_l1.clone(),
        )
        .await?;
        let processor = syncer.processor();
        let task_ct = ct.clone();
        tasks.spawn(async move { syncer.start(task_ct).await.map_err(Into::into) });
        Some(processor)
    } else {
        None
    };

    let start_bridge_sync = |is_l1: bool| -> eyre::Result<_> {
        let sync_config =
            if is_l1 { config.bridge_l1_sync.clone() } else { config.bridge_l2_sync.clone() };
        let syncer_id = if is_l1 { "bridgel1sync" } else { "bridgel2sync" };
        Ok(BridgeSyncConfig {
            syncer_id: syncer_id.to_owned(),
            db_path: format!("sqlite://{}?mode=rwc", sync_config.db_path),
            bridge_addr: sync_config.bridge_addr,
            sync_block_chunk_size: sync_config.sync_block_chunk_size,
            block_finality: sync_config.block_finality,
            finalized_block_type: sync_config.finalized_block_type,
            wait_for_new_blocks_period: Duration::from_secs(
                sync_config.wait_for_new_blocks_period_secs,
            ),
            retry: retry(
                sync_config.retry_after_error_period_secs,
                sync_config.max_retry_attempts_after_error,
            ),
            require_storage_content_compatibility: sync_config
                .require_storage_content_compatibility,
        })
    };

    let bridge_l1 = if components.contains(&Component::BridgeL1Sync) {
        let syncer = BridgeSync::new(
            start_bridge_sync(true)?,
            l1_client.clone(),
            reorg_detector_l1.clone(),
        )
        .await?;
        let processor = syncer.processor();
        let task_ct = ct.clone();
        tasks.spawn(async move { syncer.start(task_ct).await.map_err(Into::into) });
        Some(processor)
    } else {
        None
    };

    let bridge_l2 = if components.contains(&Component::BridgeL2Sync) {
        let syncer = BridgeSync::new(
            start_bridge_sync(false)?,
            l2_client.clone(),
            reorg_detector_l2.clone(),
        )
        .await?;
        let processor = syncer.processor();
        let task_ct = ct.clone();
        tasks.spawn(async move { syncer.start(task_ct).await.map_err(Into::into) });
        Some(processor)
    } else {
        None
    };

    // the bridge query service, held alive for the HTTP layer to mount.
    let _bridge_service = if components.contains(&Component::Bridge) {
        Some(Arc::new(BridgeService::new(
            config.network_id,
            l1_info_tree
                .clone()
                .ok_or_eyre("the bridge component requires l1infotreesync")?,
            bridge_l1.clone().ok_or_eyre("the bridge component requires bridgel1sync")?,
            bridge_l2.clone().ok_or_eyre("the bridge component requires bridgel2sync")?,
        )))
    } else {
        None
    };

    if components.contains(&Component::Aggsender) {
        let aggsender_config = &config.aggsender;
        let l1_info_tree = l1_info_tree
            .clone()
            .ok_or_eyre("the aggsender component requires l1infotreesync")?;
        let bridge_l2 =
            bridge_l2.clone().ok_or_eyre("the aggsender component requires bridgel2sync")?;

        let agglayer = Arc::new(JsonRpcAgglayerClient::new(
            aggsender_config.agglayer_url.parse().wrap_err("invalid agglayer url")?,
        ));
        let storage =
            AggsenderStorage::new(&format!("sqlite://{}?mode=rwc", aggsender_config.db_path))
                .await?;

        let signer_key = aggsender_config.private_key.trim_start_matches("0x");
        let signer: Arc<PrivateKeySigner> = Arc::new(
            signer_key.parse().map_err(|_| eyre!("invalid aggsender private key"))?,
        );

        // the epoch clock follows the agglayer configuration.
        let clock = agglayer.get_epoch_configuration().await.map_err(|err| {
            eyre!("failed to fetch the epoch configuration from the agglayer: {err}")
        })?;
        let (epoch_notifier, epoch_events) = EpochNotifier::new(EpochNotifierConfig::from_clock(
            clock,
            aggsender_config.epoch_notification_percentage,
        ))?;

        let block_notifier = Arc::new(BlockNotifier::new(
            l1_client.clone(),
            aggkit_primitives::BlockNumberFinality::Latest,
            Duration::from_secs(aggsender_config.block_poll_period_secs),
        ));
        let block_feed = block_notifier.subscribe();
        let task_ct = ct.clone();
        let notifier = block_notifier.clone();
        tasks.spawn(async move {
            notifier.start(task_ct).await;
            Ok(())
        });
        let task_ct = ct.clone();
        tasks.spawn(async move {
            epoch_notifier.start(task_ct, block_feed).await;
            Ok(())
        });

        let base = BaseFlow::new(
            storage.clone(),
            Arc::new(BridgeSyncQuerier::new(bridge_l2)),
            Arc::new(L1InfoTreeSyncQuerier::new(l1_client.clone(), l1_info_tree)),
            config.network_id,
            aggsender_config.start_l2_block,
            aggsender_config.max_l2_block,
        );

        let task_ct = ct.clone();
        match aggsender_config.mode {
            AggsenderMode::PessimisticProof => {
                let flow = PessimisticFlow::new(base, signer);
                let sender =
                    AggSender::new(flow, agglayer, storage, epoch_events, config.network_id);
                tasks.spawn(async move { sender.start(task_ct).await.map_err(Into::into) });
            }
            AggsenderMode::AggchainProof => {
                let prover_url = aggsender_config
                    .prover_url
                    .as_ref()
                    .ok_or_eyre("AggchainProof mode requires aggsender.prover_url")?;
                let prover = Arc::new(JsonRpcProverClient::new(
                    prover_url.parse().wrap_err("invalid prover url")?,
                ));
                let flow = AggchainProverFlow::new(
                    base,
                    prover,
                    Arc::new(NoInjectedGers),
                    signer.clone(),
                    Arc::new(StaticOptimisticModeQuerier(aggsender_config.optimistic_mode)),
                    Arc::new(UnsupportedOptimisticSigner),
                );
                let sender =
                    AggSender::new(flow, agglayer, storage, epoch_events, config.network_id);
                tasks.spawn(async move { sender.start(task_ct).await.map_err(Into::into) });
            }
        }
    }

    supervise(ct, tasks).await
}

/// Waits for ctrl-c or the first task failure, then cancels everything and
/// drains the remaining tasks.
async fn supervise(
    ct: CancellationToken,
    mut tasks: JoinSet<eyre::Result<()>>,
) -> eyre::Result<()> {
    let mut result = Ok(());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "aggkit", "shutdown signal received");
        }
        joined = tasks.join_next() => {
            match joined {
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(err))) => {
                    tracing::error!(target: "aggkit", %err, "component failed");
                    result = Err(err);
                }
                Some(Err(err)) => {
                    tracing::error!(target: "aggkit", %err, "component panicked");
                    result = Err(eyre!("component panicked: {err}"));
                }
                None => {}
            }
        }
    }

    ct.cancel();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(target: "aggkit", %err, "component failed during shutdown");
                if result.is_ok() {
                    result = Err(err);
                }
            }
            Err(err) => {
                tracing::error!(target: "aggkit", %err, "component panicked during shutdown");
                if result.is_ok() {
                    result = Err(eyre!("component panicked: {err}"));
                }
            }
        }
    }
    result
}

/// The optimistic path needs a trusted-sequencer signer; this build wires a
/// placeholder that refuses to sign.
#[derive(Debug)]
struct UnsupportedOptimisticSigner;

#[async_trait::async_trait]
impl aggkit_aggsender::OptimisticSigner for UnsupportedOptimisticSigner {
    async fn sign(
        &self,
        _request: &aggkit_aggsender::prover::AggchainProofRequest,
        _new_local_exit_root: alloy_primitives::B256,
        _claims: &[aggkit_primitives::Claim],
    ) -> Result<Vec<u8>, aggkit_aggsender::AggsenderError> {
        Err(aggkit_aggsender::AggsenderError::Signer(
            "optimistic signing is not configured".to_owned(),
        ))
    }
}
