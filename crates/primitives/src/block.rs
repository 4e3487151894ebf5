use alloy_rpc_types_eth::BlockNumberOrTag;
use core::cmp::Ordering;
use std::fmt;

/// Information about a block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockInfo {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: alloy_primitives::B256,
}

impl BlockInfo {
    /// Returns a new instance of [`BlockInfo`].
    pub const fn new(number: u64, hash: alloy_primitives::B256) -> Self {
        Self { number, hash }
    }
}

impl PartialOrd for BlockInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.number.partial_cmp(&other.number)
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockInfo {{ number: {}, hash: {} }}", self.number, self.hash)
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl arbitrary::Arbitrary<'_> for BlockInfo {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let number = u.int_in_range(0..=u32::MAX)?;
        let hash = alloy_primitives::B256::arbitrary(u)?;
        Ok(Self { number: number as u64, hash })
    }
}

/// The finality tag a syncer queries blocks with.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BlockNumberFinality {
    /// The latest block.
    #[default]
    Latest,
    /// The safe block.
    Safe,
    /// The finalized block.
    Finalized,
    /// The pending block.
    Pending,
    /// The earliest block.
    Earliest,
}

impl BlockNumberFinality {
    /// Converts the finality into the corresponding RPC block tag.
    pub const fn as_tag(&self) -> BlockNumberOrTag {
        match self {
            Self::Latest => BlockNumberOrTag::Latest,
            Self::Safe => BlockNumberOrTag::Safe,
            Self::Finalized => BlockNumberOrTag::Finalized,
            Self::Pending => BlockNumberOrTag::Pending,
            Self::Earliest => BlockNumberOrTag::Earliest,
        }
    }

    /// Whether blocks at this finality can be considered immutable.
    pub const fn is_finalized(&self) -> bool {
        matches!(self, Self::Safe | Self::Finalized)
    }

    /// Ranks the finality: a higher rank means more finalized.
    const fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Latest => 1,
            Self::Safe => 2,
            Self::Finalized => 3,
            Self::Earliest => 4,
        }
    }

    /// Returns true if `self` is at least as finalized as `other`.
    pub const fn is_at_least(&self, other: &Self) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for BlockNumberFinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Latest => "Latest",
            Self::Safe => "Safe",
            Self::Finalized => "Finalized",
            Self::Pending => "Pending",
            Self::Earliest => "Earliest",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finality_ordering() {
        assert!(BlockNumberFinality::Finalized.is_at_least(&BlockNumberFinality::Safe));
        assert!(BlockNumberFinality::Safe.is_at_least(&BlockNumberFinality::Latest));
        assert!(!BlockNumberFinality::Latest.is_at_least(&BlockNumberFinality::Safe));
        assert!(BlockNumberFinality::Latest.is_at_least(&BlockNumberFinality::Latest));
    }

    #[test]
    fn test_finality_is_finalized() {
        assert!(BlockNumberFinality::Safe.is_finalized());
        assert!(BlockNumberFinality::Finalized.is_finalized());
        assert!(!BlockNumberFinality::Latest.is_finalized());
        assert!(!BlockNumberFinality::Pending.is_finalized());
    }
}
