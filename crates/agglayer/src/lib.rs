//! Wire types and the client interface of the agglayer settlement layer.
//!
//! The JSON shapes mirror the `agglayer/node/v1` service: 32-byte values are
//! `0x`-prefixed lowercase hex, amounts are decimal strings, raw byte arrays
//! are unprefixed hex, and the polymorphic `claim_data` / `aggchain_data`
//! objects are tagged unions discriminated by their unique key.

mod certificate;
pub use certificate::{
    AggchainData, AggchainDataProof, AggchainDataSignature, BridgeExit, Certificate, LeafType,
    TokenInfo,
};

mod claim;
pub use claim::{
    ClaimData, ClaimFromMainnet, ClaimFromRollup, ImportedBridgeExit,
    ImportedBridgeExitWithBlockNumber, L1InfoTreeLeaf, L1InfoTreeLeafInner, MerkleProof,
    ProvenInsertedGer, ProvenInsertedGerWithBlockNumber,
};

mod client;
pub use client::{AgglayerClient, AgglayerClientError};

mod header;
pub use header::{CertificateHeader, ClockConfiguration, GenericError};

mod rpc;
pub use rpc::JsonRpcAgglayerClient;

mod status;
pub use status::{CertificateStatus, CertificateType};

pub(crate) mod serde_helpers;
