use sea_orm::{ConnectionTrait, StreamTrait};

/// A type that provides access to an underlying database connection, either a
/// plain connection or an open transaction. The operations traits are
/// implemented for any provider so the same queries can run atomically.
pub trait DatabaseConnectionProvider: Send + Sync {
    /// The underlying connection type.
    type Connection: ConnectionTrait + StreamTrait + Send + Sync;

    /// Returns a handle to the underlying connection.
    fn get_connection(&self) -> &Self::Connection;
}
