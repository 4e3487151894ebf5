use crate::prover::ProverError;

use aggkit_agglayer::{AgglayerClientError, CertificateType};
use alloy_primitives::B256;

/// The error type of the aggsender.
#[derive(Debug, thiserror::Error)]
pub enum AggsenderError {
    /// The certificate storage failed.
    #[error(transparent)]
    Storage(#[from] aggkit_db::DatabaseError),
    /// The L2 bridge querier failed.
    #[error("bridge query error: {0}")]
    BridgeQuery(String),
    /// The L1 info tree querier failed.
    #[error("l1 info tree query error: {0}")]
    L1InfoTreeQuery(String),
    /// The prover failed (other than "no proof built yet").
    #[error(transparent)]
    Prover(#[from] ProverError),
    /// The agglayer rejected or failed a request.
    #[error(transparent)]
    Agglayer(#[from] AgglayerClientError),
    /// The certificate signer failed.
    #[error("signer error: {0}")]
    Signer(String),
    /// A claim of the range does not belong to the selected finalized L1
    /// info tree root. The range must not be submitted.
    #[error(
        "claim with global index {global_index} (GER {global_exit_root}) is not part of the \
         finalized L1 info tree root {root} (leaf count {leaf_count})"
    )]
    ClaimNotInFinalizedL1InfoTree {
        /// The packed global index of the offending claim.
        global_index: alloy_primitives::U256,
        /// The global exit root of the offending claim.
        global_exit_root: B256,
        /// The selected finalized root.
        root: B256,
        /// The leaf count of the selected root.
        leaf_count: u32,
    },
    /// A claim is missing the SMT proofs recovered from its calldata.
    #[error("claim with global index {0} is missing its calldata proofs")]
    MissingClaimProof(alloy_primitives::U256),
    /// The locally computed local exit root does not match the prover's.
    #[error("local exit root mismatch: local {local}, prover {prover}")]
    LocalExitRootMismatch {
        /// The locally computed root.
        local: B256,
        /// The root reported by the prover.
        prover: B256,
    },
    /// The certificate mode changed while a certificate is open.
    #[error(
        "certificate type changed from {open} to {current} while a certificate is open; \
         operator intervention required"
    )]
    ModeChangedWhileOpen {
        /// The type of the open certificate.
        open: CertificateType,
        /// The type the flow would generate now.
        current: CertificateType,
    },
    /// The candidate block range is inconsistent with the last certificate.
    #[error("invalid block range: {0}")]
    InvalidBlockRange(String),
    /// The epoch notifier configuration is invalid.
    #[error("invalid epoch config: {0}")]
    InvalidEpochConfig(String),
}
