mod aggsender;
pub use aggsender::{AggsenderOperations, CertificateInfo, StoredAggchainProof};

mod bridge;
pub use bridge::BridgeOperations;

mod l1info;
pub use l1info::L1InfoTreeOperations;

mod sync;
pub use sync::SyncOperations;

mod tree;
pub use tree::{TreeOperations, TreeTag};
