//! Log decoding for the `GlobalExitRootV2` and `RollupManager` contracts.

use crate::event::{self, Event};

use aggkit_sync::LogAppenderMap;
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted by `PolygonZkEVMGlobalExitRootV2` when a new leaf is appended.
    event UpdateL1InfoTree(bytes32 indexed mainnetExitRoot, bytes32 indexed rollupExitRoot);

    /// Emitted by `PolygonZkEVMGlobalExitRootV2` together with the resulting
    /// tree root.
    event UpdateL1InfoTreeV2(bytes32 currentL1InfoRoot, uint32 indexed leafCount, uint256 blockhash, uint64 minTimestamp);

    /// Emitted by `PolygonRollupManager` when a rollup's batches are
    /// verified.
    event VerifyBatchesTrustedAggregator(uint32 indexed rollupID, uint64 numBatch, bytes32 stateRoot, bytes32 exitRoot, address indexed aggregator);

    /// Emitted by `PolygonZkEVMGlobalExitRootV2` at initialization.
    event InitL1InfoRootMap(uint32 leafCount, bytes32 currentL1InfoRoot);
}

/// Builds the appender map decoding the four watched log topics into the
/// typed [`Event`] union.
pub(crate) fn build_appenders() -> LogAppenderMap<Event> {
    let mut appenders = LogAppenderMap::new();

    appenders.insert(UpdateL1InfoTree::SIGNATURE_HASH, |header, log| {
        let decoded = UpdateL1InfoTree::decode_log(&log.inner)?.data;
        Ok(Event::UpdateL1InfoTree(event::UpdateL1InfoTree {
            block_position: log.log_index.unwrap_or_default(),
            mainnet_exit_root: decoded.mainnetExitRoot,
            rollup_exit_root: decoded.rollupExitRoot,
            parent_hash: header.parent_hash,
            timestamp: header.timestamp,
        }))
    });

    appenders.insert(UpdateL1InfoTreeV2::SIGNATURE_HASH, |_header, log| {
        let decoded = UpdateL1InfoTreeV2::decode_log(&log.inner)?.data;
        Ok(Event::UpdateL1InfoTreeV2(event::UpdateL1InfoTreeV2 {
            current_l1_info_root: decoded.currentL1InfoRoot,
            leaf_count: decoded.leafCount,
            block_hash: decoded.blockhash.into(),
            min_timestamp: decoded.minTimestamp,
        }))
    });

    appenders.insert(VerifyBatchesTrustedAggregator::SIGNATURE_HASH, |_header, log| {
        let decoded = VerifyBatchesTrustedAggregator::decode_log(&log.inner)?.data;
        Ok(Event::VerifyBatches(event::VerifyBatches {
            block_position: log.log_index.unwrap_or_default(),
            rollup_id: decoded.rollupID,
            num_batch: decoded.numBatch,
            state_root: decoded.stateRoot,
            exit_root: decoded.exitRoot,
            aggregator: decoded.aggregator,
        }))
    });

    appenders.insert(InitL1InfoRootMap::SIGNATURE_HASH, |_header, log| {
        let decoded = InitL1InfoRootMap::decode_log(&log.inner)?.data;
        Ok(Event::InitL1InfoRootMap(event::InitL1InfoRootMap {
            leaf_count: decoded.leafCount,
            current_l1_info_root: decoded.currentL1InfoRoot,
        }))
    });

    appenders
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[test]
    fn test_event_signatures_match_the_contracts() {
        assert_eq!(
            UpdateL1InfoTree::SIGNATURE_HASH,
            keccak256("UpdateL1InfoTree(bytes32,bytes32)")
        );
        assert_eq!(
            UpdateL1InfoTreeV2::SIGNATURE_HASH,
            keccak256("UpdateL1InfoTreeV2(bytes32,uint32,uint256,uint64)")
        );
        assert_eq!(
            VerifyBatchesTrustedAggregator::SIGNATURE_HASH,
            keccak256("VerifyBatchesTrustedAggregator(uint32,uint64,bytes32,bytes32,address)")
        );
        assert_eq!(
            InitL1InfoRootMap::SIGNATURE_HASH,
            keccak256("InitL1InfoRootMap(uint32,bytes32)")
        );
    }

    #[test]
    fn test_appenders_cover_all_topics() {
        let appenders = build_appenders();
        assert_eq!(appenders.topics().len(), 4);
    }
}
