use super::{transaction::DatabaseTransaction, DatabaseConnectionProvider};
use crate::error::DatabaseError;

use sea_orm::{ConnectOptions, Database as SeaOrmDatabase, DatabaseConnection, TransactionTrait};

/// The [`Database`] struct is responsible for interacting with a syncer
/// database.
///
/// It wraps a [`sea_orm::DatabaseConnection`] and implements
/// [`DatabaseConnectionProvider`] so the operations traits apply directly.
/// Atomic operations go through [`Database::tx`] which returns a
/// [`DatabaseTransaction`] implementing the same traits.
#[derive(Debug)]
pub struct Database {
    /// The underlying database connection.
    connection: DatabaseConnection,
}

impl Database {
    /// Creates a new [`Database`] instance associated with the provided
    /// database URL, e.g. `sqlite://aggsender.sqlite?mode=rwc`.
    pub async fn new(database_url: &str) -> Result<Self, DatabaseError> {
        let mut options = ConnectOptions::new(database_url);
        options.sqlx_logging(false);
        let connection = SeaOrmDatabase::connect(options).await?;
        Ok(Self { connection })
    }

    /// Creates a new [`DatabaseTransaction`] which can be used for atomic
    /// operations.
    pub async fn tx(&self) -> Result<DatabaseTransaction, DatabaseError> {
        Ok(DatabaseTransaction::new(self.connection.begin().await?))
    }
}

impl DatabaseConnectionProvider for Database {
    type Connection = DatabaseConnection;

    fn get_connection(&self) -> &Self::Connection {
        &self.connection
    }
}

impl From<DatabaseConnection> for Database {
    fn from(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        operations::{AggsenderOperations, BridgeOperations, L1InfoTreeOperations},
        test_utils::setup_test_db,
        CertificateInfo,
    };

    use aggkit_primitives::{Bridge, Claim, L1InfoTreeLeaf};
    use arbitrary::{Arbitrary, Unstructured};
    use rand::Rng;

    fn unstructured_bytes() -> [u8; 4096] {
        let mut bytes = [0u8; 4096];
        rand::rng().fill(bytes.as_mut_slice());
        bytes
    }

    #[tokio::test]
    async fn test_database_round_trip_bridge() {
        // Set up the test database.
        let db = setup_test_db().await;

        // Generate a random bridge event.
        let bytes = unstructured_bytes();
        let mut u = Unstructured::new(&bytes);
        let bridge = Bridge {
            block_num: u32::arbitrary(&mut u).unwrap() as u64,
            block_pos: u32::arbitrary(&mut u).unwrap() as u64,
            block_timestamp: u32::arbitrary(&mut u).unwrap() as u64,
            ..Bridge::arbitrary(&mut u).unwrap()
        };

        // Round trip the bridge through the database.
        db.insert_bridge(bridge.clone()).await.unwrap();
        let from_db = db
            .get_bridge_by_deposit_count(bridge.deposit_count)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bridge, from_db);
    }

    #[tokio::test]
    async fn test_database_round_trip_claim() {
        // Set up the test database.
        let db = setup_test_db().await;

        // Generate a random claim event.
        let bytes = unstructured_bytes();
        let mut u = Unstructured::new(&bytes);
        let claim = Claim {
            block_num: 7,
            block_pos: u32::arbitrary(&mut u).unwrap() as u64,
            block_timestamp: u32::arbitrary(&mut u).unwrap() as u64,
            ..Claim::arbitrary(&mut u).unwrap()
        };

        // Round trip the claim through the database.
        db.insert_claim(claim.clone()).await.unwrap();
        let claims = db.get_claims_in_range(7, 7).await.unwrap();
        assert_eq!(claims, vec![claim]);
    }

    #[tokio::test]
    async fn test_database_round_trip_l1info_leaf() {
        // Set up the test database.
        let db = setup_test_db().await;

        // Generate a random leaf.
        let bytes = unstructured_bytes();
        let mut u = Unstructured::new(&bytes);
        let leaf = L1InfoTreeLeaf {
            block_number: u32::arbitrary(&mut u).unwrap() as u64,
            block_position: u32::arbitrary(&mut u).unwrap() as u64,
            timestamp: u32::arbitrary(&mut u).unwrap() as u64,
            ..L1InfoTreeLeaf::arbitrary(&mut u).unwrap()
        };

        // Round trip the leaf through the database, by index and by GER.
        db.insert_l1info_leaf(leaf.clone()).await.unwrap();
        let by_index =
            db.get_l1info_leaf_by_index(leaf.l1_info_tree_index).await.unwrap().unwrap();
        assert_eq!(leaf, by_index);
        let by_ger =
            db.get_l1info_leaf_by_ger(leaf.global_exit_root()).await.unwrap().unwrap();
        assert_eq!(leaf, by_ger);
    }

    #[tokio::test]
    async fn test_database_round_trip_certificate() {
        // Set up the test database.
        let db = setup_test_db().await;

        let info = CertificateInfo {
            network_id: 3,
            height: 11,
            certificate_id: alloy_primitives::B256::repeat_byte(5),
            prev_local_exit_root: Some(alloy_primitives::B256::repeat_byte(6)),
            new_local_exit_root: alloy_primitives::B256::repeat_byte(7),
            epoch: Some(9),
            from_block: 100,
            to_block: 110,
            created_at: 1_700_000_000,
            retry_count: 2,
            l1_info_tree_leaf_count: 33,
            ..Default::default()
        };

        db.save_certificate_header(info.clone()).await.unwrap();
        let from_db = db.get_certificate_by_height(11).await.unwrap().unwrap();
        assert_eq!(info, from_db);
    }
}
