use aggkit_db::DatabaseError;

/// The error type for tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A database error occurred.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The requested root or node is not persisted.
    #[error("not found")]
    NotFound,
    /// A leaf was inserted out of order.
    #[error("invalid leaf index: expected {expected}, got {got}")]
    InvalidLeafIndex {
        /// The next expected leaf index.
        expected: u32,
        /// The index of the rejected leaf.
        got: u32,
    },
}
