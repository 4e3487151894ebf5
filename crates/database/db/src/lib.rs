//! A library responsible for interacting with the per-syncer databases.

pub mod models;
pub use models::{init_root_map::InitL1InfoRootMap, verify_batches::VerifyBatches};

mod connection;
pub use connection::DatabaseConnectionProvider;

mod db;
pub use db::Database;

mod transaction;
pub use transaction::DatabaseTransaction;

mod error;
pub use error::DatabaseError;

mod operations;
pub use operations::{
    AggsenderOperations, BridgeOperations, CertificateInfo, L1InfoTreeOperations,
    StoredAggchainProof, SyncOperations, TreeOperations, TreeTag,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use sea_orm::DbErr;
