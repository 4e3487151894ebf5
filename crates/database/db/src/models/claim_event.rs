use aggkit_primitives::Claim;
use sea_orm::{entity::prelude::*, ActiveValue};

/// A database model that represents a claim event.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "claim_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    block_num: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    block_pos: i64,
    tx_hash: Vec<u8>,
    global_index: Vec<u8>,
    origin_network: i64,
    origin_address: Vec<u8>,
    destination_network: i64,
    destination_address: Vec<u8>,
    amount: Vec<u8>,
    mainnet_exit_root: Vec<u8>,
    rollup_exit_root: Vec<u8>,
    global_exit_root: Vec<u8>,
    metadata: Vec<u8>,
    block_timestamp: i64,
    proof_local_exit_root: Option<Vec<u8>>,
    proof_rollup_exit_root: Option<Vec<u8>>,
}

fn encode_proof(proof: Option<Box<[alloy_primitives::B256; 32]>>) -> Option<Vec<u8>> {
    proof.map(|siblings| siblings.iter().flat_map(|hash| hash.0).collect())
}

fn decode_proof(raw: Option<Vec<u8>>) -> Option<Box<[alloy_primitives::B256; 32]>> {
    let raw = raw?;
    let mut siblings = Box::new([alloy_primitives::B256::ZERO; 32]);
    for (i, chunk) in raw.chunks_exact(32).take(32).enumerate() {
        siblings[i] = super::b256(chunk);
    }
    Some(siblings)
}

/// The relation for the claim event model.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// The active model behavior for the claim event model.
impl ActiveModelBehavior for ActiveModel {}

impl From<Claim> for ActiveModel {
    fn from(value: Claim) -> Self {
        Self {
            block_num: ActiveValue::Set(
                value.block_num.try_into().expect("block number should fit in i64"),
            ),
            block_pos: ActiveValue::Set(
                value.block_pos.try_into().expect("block position should fit in i64"),
            ),
            tx_hash: ActiveValue::Set(value.tx_hash.to_vec()),
            global_index: ActiveValue::Set(value.global_index.to_be_bytes::<32>().to_vec()),
            origin_network: ActiveValue::Set(value.origin_network as i64),
            origin_address: ActiveValue::Set(value.origin_address.to_vec()),
            destination_network: ActiveValue::Set(value.destination_network as i64),
            destination_address: ActiveValue::Set(value.destination_address.to_vec()),
            amount: ActiveValue::Set(value.amount.to_be_bytes::<32>().to_vec()),
            mainnet_exit_root: ActiveValue::Set(value.mainnet_exit_root.to_vec()),
            rollup_exit_root: ActiveValue::Set(value.rollup_exit_root.to_vec()),
            global_exit_root: ActiveValue::Set(value.global_exit_root.to_vec()),
            metadata: ActiveValue::Set(value.metadata),
            block_timestamp: ActiveValue::Set(
                value.block_timestamp.try_into().expect("timestamp should fit in i64"),
            ),
            proof_local_exit_root: ActiveValue::Set(encode_proof(value.proof_local_exit_root)),
            proof_rollup_exit_root: ActiveValue::Set(encode_proof(value.proof_rollup_exit_root)),
        }
    }
}

impl From<Model> for Claim {
    fn from(value: Model) -> Self {
        Self {
            block_num: value.block_num as u64,
            block_pos: value.block_pos as u64,
            tx_hash: super::b256(&value.tx_hash),
            global_index: super::u256(&value.global_index),
            origin_network: value.origin_network as u32,
            origin_address: super::address(&value.origin_address),
            destination_network: value.destination_network as u32,
            destination_address: super::address(&value.destination_address),
            amount: super::u256(&value.amount),
            mainnet_exit_root: super::b256(&value.mainnet_exit_root),
            rollup_exit_root: super::b256(&value.rollup_exit_root),
            global_exit_root: super::b256(&value.global_exit_root),
            metadata: value.metadata,
            block_timestamp: value.block_timestamp as u64,
            proof_local_exit_root: decode_proof(value.proof_local_exit_root),
            proof_rollup_exit_root: decode_proof(value.proof_rollup_exit_root),
        }
    }
}
