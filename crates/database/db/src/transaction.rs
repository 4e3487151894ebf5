use super::DatabaseConnectionProvider;
use crate::error::DatabaseError;

/// A database transaction. Operations performed on the transaction are atomic
/// and only visible to readers once [`DatabaseTransaction::commit`] returns.
#[derive(Debug)]
pub struct DatabaseTransaction {
    transaction: sea_orm::DatabaseTransaction,
}

impl DatabaseTransaction {
    /// Wraps an open [`sea_orm::DatabaseTransaction`].
    pub const fn new(transaction: sea_orm::DatabaseTransaction) -> Self {
        Self { transaction }
    }

    /// Commits the transaction.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        Ok(self.transaction.commit().await?)
    }

    /// Rolls the transaction back, discarding all changes.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        Ok(self.transaction.rollback().await?)
    }
}

impl DatabaseConnectionProvider for DatabaseTransaction {
    type Connection = sea_orm::DatabaseTransaction;

    fn get_connection(&self) -> &Self::Connection {
        &self.transaction
    }
}
