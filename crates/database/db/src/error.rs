/// The error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A database error occurred.
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    /// The requested row was not found.
    #[error("not found")]
    NotFound,
    /// Failed to serde a persisted JSON value.
    #[error("failed to serde persisted value: {0}")]
    SerdeError(#[from] serde_json::Error),
    /// An unknown certificate status string was read from storage.
    #[error("unknown certificate status: {0}")]
    UnknownCertificateStatus(String),
    /// An unknown certificate type string was read from storage.
    #[error("unknown certificate type: {0}")]
    UnknownCertificateType(String),
}
