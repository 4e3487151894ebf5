//! Database models for the per-syncer tables.

pub mod aggchain_proof;
pub mod bridge_event;
pub mod certificate_info;
pub mod claim_event;
pub mod init_root_map;
pub mod l1info_leaf;
pub mod legacy_token_migration;
pub mod runtime_data;
pub mod sync_block;
pub mod token_mapping;
pub mod tree_node;
pub mod tree_root;
pub mod verify_batches;

pub(crate) fn b256(bytes: &[u8]) -> alloy_primitives::B256 {
    alloy_primitives::B256::from_slice(bytes)
}

pub(crate) fn address(bytes: &[u8]) -> alloy_primitives::Address {
    alloy_primitives::Address::from_slice(bytes)
}

pub(crate) fn u256(bytes: &[u8]) -> alloy_primitives::U256 {
    alloy_primitives::U256::from_be_slice(bytes)
}
