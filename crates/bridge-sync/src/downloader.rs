//! Log decoding for the bridge contract.

use crate::event::Event;

use aggkit_primitives::{Bridge, Claim, LegacyTokenMigration, TokenMapping};
use aggkit_sync::LogAppenderMap;
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted when an asset or message is bridged out of this network.
    event BridgeEvent(uint8 leafType, uint32 originNetwork, address originAddress, uint32 destinationNetwork, address destinationAddress, uint256 amount, bytes metadata, uint32 depositCount);

    /// Emitted when an exit from another network is claimed on this one.
    event ClaimEvent(uint256 globalIndex, uint32 originNetwork, address originAddress, address destinationAddress, uint256 amount);

    /// Emitted when a wrapped token is deployed for a foreign token.
    event NewWrappedToken(uint32 originNetwork, address originTokenAddress, address wrappedTokenAddress, bytes metadata);

    /// Emitted when legacy wrapped tokens are migrated to the updated token.
    event MigrateLegacyToken(address sender, address legacyTokenAddress, address updatedTokenAddress, uint256 amount);
}

/// Builds the appender map decoding the bridge contract topics into the
/// typed [`Event`] union.
pub(crate) fn build_appenders() -> LogAppenderMap<Event> {
    let mut appenders = LogAppenderMap::new();

    appenders.insert(BridgeEvent::SIGNATURE_HASH, |header, log| {
        let decoded = BridgeEvent::decode_log(&log.inner)?.data;
        Ok(Event::Bridge(Bridge {
            block_num: header.num,
            block_pos: log.log_index.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            from_address: Address::ZERO,
            leaf_type: decoded.leafType,
            origin_network: decoded.originNetwork,
            origin_address: decoded.originAddress,
            destination_network: decoded.destinationNetwork,
            destination_address: decoded.destinationAddress,
            amount: decoded.amount,
            metadata: decoded.metadata.to_vec(),
            deposit_count: decoded.depositCount,
            is_native_token: decoded.originAddress == Address::ZERO,
            calldata: Vec::new(),
            block_timestamp: header.timestamp,
        }))
    });

    appenders.insert(ClaimEvent::SIGNATURE_HASH, |header, log| {
        let decoded = ClaimEvent::decode_log(&log.inner)?.data;
        Ok(Event::Claim(Claim {
            block_num: header.num,
            block_pos: log.log_index.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            global_index: decoded.globalIndex,
            origin_network: decoded.originNetwork,
            origin_address: decoded.originAddress,
            destination_address: decoded.destinationAddress,
            amount: decoded.amount,
            // the exit roots are not part of the event, they are recovered
            // from the claim transaction calldata by the enrichment step.
            mainnet_exit_root: Default::default(),
            rollup_exit_root: Default::default(),
            global_exit_root: Default::default(),
            destination_network: 0,
            metadata: Vec::new(),
            block_timestamp: header.timestamp,
            proof_local_exit_root: None,
            proof_rollup_exit_root: None,
        }))
    });

    appenders.insert(NewWrappedToken::SIGNATURE_HASH, |header, log| {
        let decoded = NewWrappedToken::decode_log(&log.inner)?.data;
        Ok(Event::TokenMapping(TokenMapping {
            block_num: header.num,
            block_pos: log.log_index.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            origin_network: decoded.originNetwork,
            origin_token_address: decoded.originTokenAddress,
            wrapped_token_address: decoded.wrappedTokenAddress,
            metadata: decoded.metadata.to_vec(),
            block_timestamp: header.timestamp,
        }))
    });

    appenders.insert(MigrateLegacyToken::SIGNATURE_HASH, |header, log| {
        let decoded = MigrateLegacyToken::decode_log(&log.inner)?.data;
        Ok(Event::LegacyTokenMigration(LegacyTokenMigration {
            block_num: header.num,
            block_pos: log.log_index.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            sender: decoded.sender,
            legacy_token_address: decoded.legacyTokenAddress,
            updated_token_address: decoded.updatedTokenAddress,
            amount: decoded.amount,
        }))
    });

    appenders
}

/// Decodes the exit roots committed by a `claimAsset`/`claimMessage`
/// transaction's calldata. The claim event itself does not carry them.
pub mod claim_calldata {
    use alloy_primitives::B256;
    use alloy_sol_types::{sol, SolCall};

    sol! {
        function claimAsset(
            bytes32[32] smtProofLocalExitRoot,
            bytes32[32] smtProofRollupExitRoot,
            uint256 globalIndex,
            bytes32 mainnetExitRoot,
            bytes32 rollupExitRoot,
            uint32 originNetwork,
            address originTokenAddress,
            uint32 destinationNetwork,
            address destinationAddress,
            uint256 amount,
            bytes metadata
        );

        function claimMessage(
            bytes32[32] smtProofLocalExitRoot,
            bytes32[32] smtProofRollupExitRoot,
            uint256 globalIndex,
            bytes32 mainnetExitRoot,
            bytes32 rollupExitRoot,
            uint32 originNetwork,
            address originAddress,
            uint32 destinationNetwork,
            address destinationAddress,
            uint256 amount,
            bytes metadata
        );
    }

    /// The proof context of a claim, recovered from calldata.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ClaimContext {
        /// The mainnet exit root the claim was proven against.
        pub mainnet_exit_root: B256,
        /// The rollup exit root the claim was proven against.
        pub rollup_exit_root: B256,
        /// The destination network of the claim.
        pub destination_network: u32,
        /// The SMT proof of the exit in its origin exit tree.
        pub proof_local_exit_root: Box<[B256; 32]>,
        /// The SMT proof of the origin local exit root in the rollup exit
        /// tree.
        pub proof_rollup_exit_root: Box<[B256; 32]>,
    }

    /// Decodes the proof context out of a claim transaction's input. Returns
    /// `None` when the calldata is not a claim call.
    pub fn decode(calldata: &[u8]) -> Option<ClaimContext> {
        if let Ok(call) = claimAssetCall::abi_decode(calldata) {
            return Some(ClaimContext {
                mainnet_exit_root: call.mainnetExitRoot,
                rollup_exit_root: call.rollupExitRoot,
                destination_network: call.destinationNetwork,
                proof_local_exit_root: Box::new(call.smtProofLocalExitRoot),
                proof_rollup_exit_root: Box::new(call.smtProofRollupExitRoot),
            });
        }
        if let Ok(call) = claimMessageCall::abi_decode(calldata) {
            return Some(ClaimContext {
                mainnet_exit_root: call.mainnetExitRoot,
                rollup_exit_root: call.rollupExitRoot,
                destination_network: call.destinationNetwork,
                proof_local_exit_root: Box::new(call.smtProofLocalExitRoot),
                proof_rollup_exit_root: Box::new(call.smtProofRollupExitRoot),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[test]
    fn test_event_signatures_match_the_contract() {
        assert_eq!(
            BridgeEvent::SIGNATURE_HASH,
            keccak256("BridgeEvent(uint8,uint32,address,uint32,address,uint256,bytes,uint32)")
        );
        assert_eq!(
            ClaimEvent::SIGNATURE_HASH,
            keccak256("ClaimEvent(uint256,uint32,address,address,uint256)")
        );
        assert_eq!(
            NewWrappedToken::SIGNATURE_HASH,
            keccak256("NewWrappedToken(uint32,address,address,bytes)")
        );
        assert_eq!(
            MigrateLegacyToken::SIGNATURE_HASH,
            keccak256("MigrateLegacyToken(address,address,address,uint256)")
        );
    }

    #[test]
    fn test_claim_calldata_round_trip() {
        use alloy_sol_types::SolCall;

        let call = claim_calldata::claimAssetCall {
            smtProofLocalExitRoot: [Default::default(); 32],
            smtProofRollupExitRoot: [Default::default(); 32],
            globalIndex: Default::default(),
            mainnetExitRoot: alloy_primitives::B256::repeat_byte(1),
            rollupExitRoot: alloy_primitives::B256::repeat_byte(2),
            originNetwork: 0,
            originTokenAddress: Default::default(),
            destinationNetwork: 3,
            destinationAddress: Default::default(),
            amount: Default::default(),
            metadata: Default::default(),
        };
        let encoded = call.abi_encode();

        let decoded = claim_calldata::decode(&encoded).unwrap();
        assert_eq!(decoded.mainnet_exit_root, alloy_primitives::B256::repeat_byte(1));
        assert_eq!(decoded.rollup_exit_root, alloy_primitives::B256::repeat_byte(2));
        assert_eq!(decoded.destination_network, 3);
    }
}
