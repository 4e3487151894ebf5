//! Primitive types shared across the aggkit node.

mod block;
pub use block::{BlockInfo, BlockNumberFinality};

mod bridge;
pub use bridge::{Bridge, Claim, GlobalIndex, LegacyTokenMigration, TokenMapping};

mod bytes;
pub use bytes::{
    big_int_to_little_endian_bytes, u32_to_be_bytes, u64_to_be_bytes, u64_to_le_bytes,
};

mod l1info;
pub use l1info::L1InfoTreeLeaf;

mod sync;
pub use sync::{RuntimeData, TreeRoot};
