//! TOML configuration of the node. Files passed with `--cfg` are merged in
//! order (later files win) and `CDK_`-prefixed environment variables
//! override scalar values.

use aggkit_primitives::BlockNumberFinality;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CDK_";

/// The node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: LogConfig,
    /// The L1 JSON-RPC endpoint.
    pub l1_url: String,
    /// The L2 JSON-RPC endpoint.
    pub l2_url: String,
    /// The op-node sidecar endpoint resolving finalized/safe on OP-stack
    /// chains.
    pub op_node_url: Option<String>,
    /// The id of the L2 network.
    pub network_id: u32,
    /// The L1 info tree syncer configuration.
    pub l1_info_tree_sync: L1InfoTreeSyncToml,
    /// The L1 bridge syncer configuration.
    pub bridge_l1_sync: BridgeSyncToml,
    /// The L2 bridge syncer configuration.
    pub bridge_l2_sync: BridgeSyncToml,
    /// The reorg detector configuration.
    pub reorg_detector: ReorgDetectorToml,
    /// The aggsender configuration.
    pub aggsender: AggsenderToml,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// The tracing filter, e.g. `info` or `aggkit=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned() }
    }
}

/// Configuration of the L1 info tree syncer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct L1InfoTreeSyncToml {
    /// The path of the syncer database.
    pub db_path: String,
    /// The address of the `GlobalExitRootV2` contract.
    pub global_exit_root_addr: Address,
    /// The address of the `RollupManager` contract.
    pub rollup_manager_addr: Address,
    /// The size of a download chunk, in blocks.
    pub sync_block_chunk_size: u64,
    /// The finality blocks are queried with.
    pub block_finality: BlockNumberFinality,
    /// The tag blocks are considered final at.
    pub finalized_block_type: BlockNumberFinality,
    /// The poll period while waiting for new blocks, in seconds.
    pub wait_for_new_blocks_period_secs: u64,
    /// The pause between retries, in seconds.
    pub retry_after_error_period_secs: u64,
    /// The maximum retry attempts before the syncer gives up.
    pub max_retry_attempts_after_error: u32,
    /// Whether a runtime-data mismatch refuses startup.
    pub require_storage_content_compatibility: bool,
}

impl Default for L1InfoTreeSyncToml {
    fn default() -> Self {
        Self {
            db_path: "l1infotreesync.sqlite".to_owned(),
            global_exit_root_addr: Address::ZERO,
            rollup_manager_addr: Address::ZERO,
            sync_block_chunk_size: 100,
            block_finality: BlockNumberFinality::Latest,
            finalized_block_type: BlockNumberFinality::Finalized,
            wait_for_new_blocks_period_secs: 2,
            retry_after_error_period_secs: 1,
            max_retry_attempts_after_error: 5,
            require_storage_content_compatibility: true,
        }
    }
}

/// Configuration of a bridge syncer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSyncToml {
    /// The path of the syncer database.
    pub db_path: String,
    /// The address of the bridge contract.
    pub bridge_addr: Address,
    /// The size of a download chunk, in blocks.
    pub sync_block_chunk_size: u64,
    /// The finality blocks are queried with.
    pub block_finality: BlockNumberFinality,
    /// The tag blocks are considered final at.
    pub finalized_block_type: BlockNumberFinality,
    /// The poll period while waiting for new blocks, in seconds.
    pub wait_for_new_blocks_period_secs: u64,
    /// The pause between retries, in seconds.
    pub retry_after_error_period_secs: u64,
    /// The maximum retry attempts before the syncer gives up.
    pub max_retry_attempts_after_error: u32,
    /// Whether a runtime-data mismatch refuses startup.
    pub require_storage_content_compatibility: bool,
}

impl Default for BridgeSyncToml {
    fn default() -> Self {
        Self {
            db_path: "bridgesync.sqlite".to_owned(),
            bridge_addr: Address::ZERO,
            sync_block_chunk_size: 100,
            block_finality: BlockNumberFinality::Latest,
            finalized_block_type: BlockNumberFinality::Finalized,
            wait_for_new_blocks_period_secs: 2,
            retry_after_error_period_secs: 1,
            max_retry_attempts_after_error: 5,
            require_storage_content_compatibility: true,
        }
    }
}

/// Configuration of the reorg detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorgDetectorToml {
    /// The poll interval of the L1 detector, in seconds.
    pub l1_check_interval_secs: u64,
    /// The poll interval of the L2 detector, in seconds.
    pub l2_check_interval_secs: u64,
    /// The finality at which tracked blocks are pruned.
    pub finality: BlockNumberFinality,
}

impl Default for ReorgDetectorToml {
    fn default() -> Self {
        Self {
            l1_check_interval_secs: 2,
            l2_check_interval_secs: 2,
            finality: BlockNumberFinality::Finalized,
        }
    }
}

/// The certificate flow the aggsender runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggsenderMode {
    /// The pessimistic-proof path.
    PessimisticProof,
    /// The aggchain-prover path.
    AggchainProof,
}

/// Configuration of the aggsender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggsenderToml {
    /// The path of the aggsender database.
    pub db_path: String,
    /// The certificate flow to run.
    pub mode: AggsenderMode,
    /// The agglayer JSON-RPC endpoint.
    pub agglayer_url: String,
    /// The proof-generation tool endpoint, required in `AggchainProof` mode.
    pub prover_url: Option<String>,
    /// The hex private key signing certificates.
    pub private_key: String,
    /// When inside the epoch to notify, 0-99.
    pub epoch_notification_percentage: u64,
    /// The first L2 block covered by the FEP path.
    pub start_l2_block: u64,
    /// The highest L2 block a certificate may cover, unlimited when absent.
    pub max_l2_block: Option<u64>,
    /// The L1 head poll period feeding the epoch clock, in seconds.
    pub block_poll_period_secs: u64,
    /// Whether the optimistic path is active.
    pub optimistic_mode: bool,
}

impl Default for AggsenderToml {
    fn default() -> Self {
        Self {
            db_path: "aggsender.sqlite".to_owned(),
            mode: AggsenderMode::PessimisticProof,
            agglayer_url: String::new(),
            prover_url: None,
            private_key: String::new(),
            epoch_notification_percentage: 50,
            start_l2_block: 0,
            max_l2_block: None,
            block_poll_period_secs: 2,
            optimistic_mode: false,
        }
    }
}

/// Loads the configuration: files merged in order, then environment
/// overrides.
pub fn load(paths: &[impl AsRef<Path>]) -> eyre::Result<Config> {
    let mut merged = toml::Table::new();
    for path in paths {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table: toml::Table = raw.parse()?;
        merge_tables(&mut merged, table);
    }
    apply_env_overrides(&mut merged, std::env::vars());
    Ok(merged.try_into()?)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// `CDK_L1_URL=...` overrides `l1_url`; `CDK_AGGSENDER_AGGLAYER_URL=...`
/// overrides `aggsender.agglayer_url`. The first segment matching a table
/// name descends into it, the rest joins into the field name.
fn apply_env_overrides(table: &mut toml::Table, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else { continue };
        let path = stripped.to_lowercase();
        set_path(table, &path, &value);
    }
}

fn set_path(table: &mut toml::Table, path: &str, value: &str) {
    // longest-prefix match against existing table keys, so field names with
    // underscores resolve unambiguously.
    let mut boundary = None;
    for (i, _) in path.match_indices('_') {
        let (head, tail) = (&path[..i], &path[i + 1..]);
        if table.get(head).is_some_and(|entry| entry.is_table()) {
            boundary = Some((head.to_owned(), tail.to_owned()));
        }
    }
    if let Some((head, tail)) = boundary {
        if let Some(toml::Value::Table(inner)) = table.get_mut(&head) {
            set_path(inner, &tail, value);
            return;
        }
    }
    table.insert(path.to_owned(), parse_env_value(value));
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(parsed) = value.parse::<i64>() {
        return toml::Value::Integer(parsed);
    }
    if let Ok(parsed) = value.parse::<bool>() {
        return toml::Value::Boolean(parsed);
    }
    toml::Value::String(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_parse() {
        let config: Config = toml::Table::new().try_into().unwrap();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.l1_info_tree_sync.sync_block_chunk_size, 100);
        assert_eq!(config.aggsender.mode, AggsenderMode::PessimisticProof);
    }

    #[test]
    fn test_later_files_win() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "l1_url = \"http://one\"\n[aggsender]\nstart_l2_block = 5").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "l1_url = \"http://two\"").unwrap();

        let config = load(&[first.path(), second.path()]).unwrap();
        assert_eq!(config.l1_url, "http://two");
        assert_eq!(config.aggsender.start_l2_block, 5);
    }

    #[test]
    fn test_env_override_paths() {
        let mut table: toml::Table =
            "l1_url = \"http://file\"\n[aggsender]\nagglayer_url = \"http://file\""
                .parse()
                .unwrap();
        apply_env_overrides(
            &mut table,
            vec![
                ("CDK_L1_URL".to_owned(), "http://env".to_owned()),
                ("CDK_AGGSENDER_AGGLAYER_URL".to_owned(), "http://agg".to_owned()),
                ("UNRELATED".to_owned(), "ignored".to_owned()),
            ]
            .into_iter(),
        );

        let config: Config = table.try_into().unwrap();
        assert_eq!(config.l1_url, "http://env");
        assert_eq!(config.aggsender.agglayer_url, "http://agg");
    }
}
