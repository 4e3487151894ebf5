use crate::{
    claim::ImportedBridgeExit,
    serde_helpers::{decimal_u256, hex_bytes, hex_bytes_map, hex_bytes_or_null},
};

use aggkit_primitives::{u32_to_be_bytes, u64_to_be_bytes, u64_to_le_bytes};
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The type of a bridge exit leaf.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafType {
    /// An asset transfer.
    #[default]
    #[serde(rename = "Transfer")]
    Asset,
    /// An arbitrary message.
    #[serde(rename = "Message")]
    Message,
}

impl LeafType {
    /// The numeric form used in hashing.
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Asset => 0,
            Self::Message => 1,
        }
    }

    /// Parses the numeric form emitted by the bridge contract.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Message,
            _ => Self::Asset,
        }
    }
}

/// Identifies a token by its origin network and address.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The network the token originates from.
    pub origin_network: u32,
    /// The token address on its origin network.
    pub origin_token_address: Address,
}

/// A token bridge exit included in a certificate.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeExit {
    /// The type of the exit leaf.
    pub leaf_type: LeafType,
    /// The bridged token.
    pub token_info: TokenInfo,
    /// The destination network of the exit.
    #[serde(rename = "dest_network")]
    pub destination_network: u32,
    /// The recipient on the destination network.
    #[serde(rename = "dest_address")]
    pub destination_address: Address,
    /// The bridged amount, as a decimal string on the wire.
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    /// The exit metadata, hex on the wire, `null` when empty.
    #[serde(with = "hex_bytes_or_null")]
    pub metadata: Vec<u8>,
}

impl BridgeExit {
    /// Returns a hash that uniquely identifies the bridge exit. Empty
    /// metadata hashes as `keccak256("")`.
    pub fn hash(&self) -> B256 {
        let empty_hash = keccak256([]);
        let metadata: &[u8] =
            if self.metadata.is_empty() { empty_hash.as_slice() } else { &self.metadata };
        let mut input = Vec::with_capacity(113 + metadata.len());
        input.push(self.leaf_type.as_u8());
        input.extend_from_slice(&u32_to_be_bytes(self.token_info.origin_network));
        input.extend_from_slice(self.token_info.origin_token_address.as_slice());
        input.extend_from_slice(&u32_to_be_bytes(self.destination_network));
        input.extend_from_slice(self.destination_address.as_slice());
        input.extend_from_slice(&B256::from(self.amount).0);
        input.extend_from_slice(metadata);
        keccak256(input)
    }
}

/// The aggchain data attached to a certificate: a bare signature on the PP
/// path, or a full aggchain proof on the FEP/optimistic path. On the wire the
/// variant is discriminated structurally by the presence of the `proof` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggchainData {
    /// An aggchain proof produced by the external prover.
    Proof(AggchainDataProof),
    /// A signature of the aggsender key.
    Signature(AggchainDataSignature),
}

/// The signature-only aggchain data of the PP path.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggchainDataSignature {
    /// The signature over the PP hash-to-sign.
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// The proof-carrying aggchain data of the FEP and optimistic paths.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggchainDataProof {
    /// The SP1 stark proof bytes.
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    /// The prover version.
    pub version: String,
    /// The verification key of the proof.
    #[serde(with = "hex_bytes")]
    pub vkey: Vec<u8>,
    /// The aggchain params committed by the proof.
    pub aggchain_params: B256,
    /// The proof context map.
    #[serde(with = "hex_bytes_map")]
    pub context: BTreeMap<String, Vec<u8>>,
    /// The signature over the FEP hash-to-sign.
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// A certificate submitted to the agglayer, proving the evolution of the
/// local exit tree over a contiguous L2 block range at a unique height.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// The id of the network the certificate proves.
    pub network_id: u32,
    /// The height of the certificate. Heights of settled certificates
    /// increase by exactly one.
    pub height: u64,
    /// The local exit root before the certified range.
    pub prev_local_exit_root: B256,
    /// The local exit root after the certified range.
    pub new_local_exit_root: B256,
    /// The bridge exits of the certified range.
    pub bridge_exits: Vec<BridgeExit>,
    /// The imported bridge exits (claims) of the certified range.
    pub imported_bridge_exits: Vec<ImportedBridgeExit>,
    /// The certificate metadata.
    pub metadata: B256,
    /// Opaque chain-specific data forwarded to the settlement contract.
    #[serde(with = "hex_bytes", skip_serializing_if = "Vec::is_empty", default)]
    pub custom_chain_data: Vec<u8>,
    /// The aggchain data proving or signing the certificate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aggchain_data: Option<AggchainData>,
    /// The leaf count of the finalized L1 info root the claims were proven
    /// against.
    #[serde(skip_serializing_if = "is_zero_u32", default)]
    pub l1_info_tree_leaf_count: u32,
}

const fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

impl Certificate {
    /// Returns a hash that uniquely identifies the certificate.
    pub fn hash(&self) -> B256 {
        let bridge_exits_part = keccak256(
            self.bridge_exits.iter().flat_map(|exit| exit.hash().0).collect::<Vec<u8>>(),
        );
        let imported_bridge_exits_part = keccak256(
            self.imported_bridge_exits.iter().flat_map(|exit| exit.hash().0).collect::<Vec<u8>>(),
        );

        let mut input = Vec::with_capacity(140);
        input.extend_from_slice(&u32_to_be_bytes(self.network_id));
        input.extend_from_slice(&u64_to_be_bytes(self.height));
        input.extend_from_slice(self.prev_local_exit_root.as_slice());
        input.extend_from_slice(self.new_local_exit_root.as_slice());
        input.extend_from_slice(bridge_exits_part.as_slice());
        input.extend_from_slice(imported_bridge_exits_part.as_slice());
        keccak256(input)
    }

    /// The hash the aggsender signs on the PP path:
    /// `keccak256(new_local_exit_root || keccak256(global_index_hashes))`.
    pub fn pp_hash_to_sign(&self) -> B256 {
        let global_index_hashes = keccak256(
            self.imported_bridge_exits
                .iter()
                .flat_map(|exit| exit.global_index_hash().0)
                .collect::<Vec<u8>>(),
        );
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(self.new_local_exit_root.as_slice());
        input[32..].copy_from_slice(global_index_hashes.as_slice());
        keccak256(input)
    }

    /// The hash the aggsender signs on the FEP path. The height and the
    /// global indexes are little-endian here; every other integer in the
    /// certificate hashing is big-endian. The asymmetry is required for hash
    /// equality with the settlement circuits.
    pub fn fep_hash_to_sign(&self) -> B256 {
        let mut chunks = Vec::new();
        for exit in &self.imported_bridge_exits {
            chunks.extend_from_slice(&exit.global_index_little_endian_bytes());
            chunks.extend_from_slice(exit.bridge_exit.hash().as_slice());
        }
        let imported_bridge_exits_hash = keccak256(chunks);

        let aggchain_params = match &self.aggchain_data {
            Some(AggchainData::Proof(proof)) => proof.aggchain_params,
            _ => keccak256([]),
        };

        let mut input = Vec::with_capacity(104);
        input.extend_from_slice(self.new_local_exit_root.as_slice());
        input.extend_from_slice(imported_bridge_exits_hash.as_slice());
        input.extend_from_slice(&u64_to_le_bytes(self.height));
        input.extend_from_slice(aggchain_params.as_slice());
        keccak256(input)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cert{{height: {}, networkID: {}, prevLER: {}, newLER: {}, exits: {}, imported_exits: {}}}",
            self.height,
            self.network_id,
            self.prev_local_exit_root,
            self.new_local_exit_root,
            self.bridge_exits.len(),
            self.imported_bridge_exits.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimData, ClaimFromMainnet};
    use aggkit_primitives::GlobalIndex;

    fn imported_exit(mainnet_flag: bool, leaf_index: u32) -> ImportedBridgeExit {
        ImportedBridgeExit {
            bridge_exit: BridgeExit { amount: U256::from(5u64), ..Default::default() },
            claim_data: Some(ClaimData::Mainnet(Box::new(ClaimFromMainnet::default()))),
            global_index: GlobalIndex::new(mainnet_flag, 0, leaf_index),
        }
    }

    #[test]
    fn test_bridge_exit_empty_metadata_hashes_as_empty_keccak() {
        let exit = BridgeExit::default();
        let mut with_meta = exit.clone();
        with_meta.metadata = keccak256([]).to_vec();
        assert_eq!(exit.hash(), with_meta.hash());
    }

    #[test]
    fn test_pp_hash_to_sign_layout() {
        let cert = Certificate {
            new_local_exit_root: B256::repeat_byte(0x11),
            imported_bridge_exits: vec![imported_exit(true, 1), imported_exit(false, 2)],
            ..Default::default()
        };

        let global_index_hashes: Vec<u8> = cert
            .imported_bridge_exits
            .iter()
            .flat_map(|exit| exit.global_index.hash().0)
            .collect();
        let expected = keccak256(
            [cert.new_local_exit_root.as_slice(), keccak256(global_index_hashes).as_slice()]
                .concat(),
        );
        assert_eq!(cert.pp_hash_to_sign(), expected);
    }

    #[test]
    fn test_fep_hash_to_sign_uses_little_endian_height() {
        let mut cert = Certificate {
            height: 1,
            new_local_exit_root: B256::repeat_byte(0x22),
            ..Default::default()
        };
        let hash_at_one = cert.fep_hash_to_sign();
        cert.height = 1 << 56;
        // A big-endian encoding would make these two heights collide after
        // byte reversal; little-endian keeps them distinct.
        assert_ne!(cert.fep_hash_to_sign(), hash_at_one);

        let expected = keccak256(
            [
                cert.new_local_exit_root.as_slice(),
                keccak256([]).as_slice(),
                &(1u64 << 56).to_le_bytes()[..],
                keccak256([]).as_slice(),
            ]
            .concat(),
        );
        assert_eq!(cert.fep_hash_to_sign(), expected);
    }

    #[test]
    fn test_certificate_json_round_trip() {
        let cert = Certificate {
            network_id: 7,
            height: 3,
            prev_local_exit_root: B256::repeat_byte(1),
            new_local_exit_root: B256::repeat_byte(2),
            bridge_exits: vec![BridgeExit {
                amount: U256::from(1_000_000u64),
                metadata: vec![0xde, 0xad],
                ..Default::default()
            }],
            imported_bridge_exits: vec![imported_exit(true, 9)],
            metadata: B256::repeat_byte(3),
            custom_chain_data: vec![1, 2, 3],
            aggchain_data: Some(AggchainData::Signature(AggchainDataSignature {
                signature: vec![0xab; 65],
            })),
            l1_info_tree_leaf_count: 42,
        };

        let encoded = serde_json::to_string(&cert).unwrap();
        let decoded: Certificate = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, cert);
    }

    #[test]
    fn test_aggchain_data_structural_discrimination() {
        let proof = AggchainData::Proof(AggchainDataProof {
            proof: vec![1],
            version: "v1".into(),
            vkey: vec![2],
            aggchain_params: B256::repeat_byte(4),
            context: BTreeMap::from([("key".to_owned(), vec![5u8])]),
            signature: vec![3],
        });
        let encoded = serde_json::to_value(&proof).unwrap();
        assert!(encoded.get("proof").is_some());
        assert_eq!(serde_json::from_value::<AggchainData>(encoded).unwrap(), proof);

        let signature = AggchainData::Signature(AggchainDataSignature { signature: vec![7; 65] });
        let encoded = serde_json::to_value(&signature).unwrap();
        assert!(encoded.get("proof").is_none());
        assert!(encoded.get("signature").is_some());
        assert_eq!(serde_json::from_value::<AggchainData>(encoded).unwrap(), signature);
    }

    #[test]
    fn test_bridge_exit_amount_is_decimal_string() {
        let exit = BridgeExit { amount: U256::from(123456u64), ..Default::default() };
        let encoded = serde_json::to_value(&exit).unwrap();
        assert_eq!(encoded["amount"], serde_json::json!("123456"));
        assert_eq!(encoded["metadata"], serde_json::Value::Null);
    }
}
