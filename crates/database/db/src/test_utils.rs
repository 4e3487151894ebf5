//! Common test helpers.

use crate::{Database, DatabaseConnectionProvider};

use aggkit_migration::{Migrator, MigratorTrait};
use sea_orm::ConnectOptions;

/// Instantiates an in-memory database with every table migrated. A single
/// connection is used so the in-memory database is shared across all
/// operations.
pub async fn setup_test_db() -> Database {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let connection =
        sea_orm::Database::connect(options).await.expect("connects to in-memory sqlite");
    let database = Database::from(connection);
    Migrator::up(database.get_connection(), None).await.expect("migrations apply");
    database
}
