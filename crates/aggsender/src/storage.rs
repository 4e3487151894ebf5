use crate::error::AggsenderError;

use aggkit_agglayer::CertificateStatus;
use aggkit_db::{AggsenderOperations, CertificateInfo, Database, StoredAggchainProof};
use aggkit_migration::{AggsenderMigrator, MigratorTrait};
use alloy_primitives::B256;
use std::sync::Arc;

/// The certificate storage of the aggsender. All mutations happen in the
/// aggsender pipeline; readers may be concurrent but see only committed rows.
#[derive(Debug, Clone)]
pub struct AggsenderStorage {
    db: Arc<Database>,
}

impl AggsenderStorage {
    /// Opens and migrates the aggsender database.
    pub async fn new(db_path: &str) -> Result<Self, AggsenderError> {
        let db = Database::new(db_path).await.map_err(aggkit_db::DatabaseError::from)?;
        AggsenderMigrator::up(aggkit_db::DatabaseConnectionProvider::get_connection(&db), None)
            .await
            .map_err(aggkit_db::DatabaseError::from)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Wraps an already migrated database, for tests.
    pub fn from_database(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Inserts or replaces the certificate header at its height.
    pub async fn save_certificate_header(
        &self,
        info: CertificateInfo,
    ) -> Result<(), AggsenderError> {
        Ok(self.db.save_certificate_header(info).await?)
    }

    /// Updates the status of the certificate at the given height.
    pub async fn update_status(
        &self,
        height: u64,
        status: CertificateStatus,
        settlement_tx_hash: Option<B256>,
    ) -> Result<(), AggsenderError> {
        Ok(self.db.update_certificate_status(height, status, settlement_tx_hash).await?)
    }

    /// Returns the header of the certificate with the greatest height.
    pub async fn get_last_sent_certificate_header(
        &self,
    ) -> Result<Option<CertificateInfo>, AggsenderError> {
        Ok(self.db.get_last_sent_certificate_header().await?)
    }

    /// Returns the last sent header together with its cached aggchain proof
    /// when the header is `InError`. A missing cache is not an error: the
    /// flow queries the prover again.
    pub async fn get_last_sent_certificate_header_with_proof_if_in_error(
        &self,
    ) -> Result<(Option<CertificateInfo>, Option<StoredAggchainProof>), AggsenderError> {
        let Some(header) = self.db.get_last_sent_certificate_header().await? else {
            return Ok((None, None));
        };
        if !header.status.is_in_error() {
            return Ok((Some(header), None));
        }
        let proof = self.db.get_aggchain_proof(header.height).await?;
        Ok((Some(header), proof))
    }

    /// Returns the certificate header at the given height.
    pub async fn get_certificate_by_height(
        &self,
        height: u64,
    ) -> Result<Option<CertificateInfo>, AggsenderError> {
        Ok(self.db.get_certificate_by_height(height).await?)
    }

    /// Caches the aggchain proof for the certificate at the given height.
    pub async fn save_aggchain_proof(
        &self,
        height: u64,
        proof: StoredAggchainProof,
    ) -> Result<(), AggsenderError> {
        Ok(self.db.save_aggchain_proof(height, proof).await?)
    }

    /// Drops the cached aggchain proof for the given height.
    pub async fn delete_cached_proof(&self, height: u64) -> Result<(), AggsenderError> {
        Ok(self.db.delete_aggchain_proof(height).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggkit_agglayer::CertificateType;
    use aggkit_db::test_utils::setup_test_db;

    fn header(height: u64, status: CertificateStatus) -> CertificateInfo {
        CertificateInfo {
            network_id: 1,
            height,
            certificate_id: B256::repeat_byte(height as u8 + 1),
            status,
            new_local_exit_root: B256::repeat_byte(0x10 + height as u8),
            from_block: height * 10 + 1,
            to_block: height * 10 + 10,
            created_at: 1000 + height,
            cert_type: CertificateType::Fep,
            ..Default::default()
        }
    }

    fn proof() -> StoredAggchainProof {
        StoredAggchainProof {
            proof: vec![1, 2, 3],
            version: "v1".into(),
            vkey: vec![4],
            aggchain_params: B256::repeat_byte(9),
            end_block: 10,
            local_exit_root: B256::repeat_byte(8),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_read_back_header() {
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(header(0, CertificateStatus::Pending)).await.unwrap();
        storage.save_certificate_header(header(1, CertificateStatus::Pending)).await.unwrap();

        let last = storage.get_last_sent_certificate_header().await.unwrap().unwrap();
        assert_eq!(last.height, 1);

        let by_height = storage.get_certificate_by_height(0).await.unwrap().unwrap();
        assert_eq!(by_height.certificate_id, B256::repeat_byte(1));
    }

    #[tokio::test]
    async fn test_update_status_and_settlement_hash() {
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(header(0, CertificateStatus::Pending)).await.unwrap();

        storage
            .update_status(0, CertificateStatus::Settled, Some(B256::repeat_byte(0xaa)))
            .await
            .unwrap();

        let updated = storage.get_certificate_by_height(0).await.unwrap().unwrap();
        assert_eq!(updated.status, CertificateStatus::Settled);
        assert_eq!(updated.settlement_tx_hash, Some(B256::repeat_byte(0xaa)));
    }

    #[tokio::test]
    async fn test_proof_is_returned_only_for_in_error_headers() {
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(header(0, CertificateStatus::Pending)).await.unwrap();
        storage.save_aggchain_proof(0, proof()).await.unwrap();

        // open header: no cached proof handed out.
        let (cert, cached) =
            storage.get_last_sent_certificate_header_with_proof_if_in_error().await.unwrap();
        assert_eq!(cert.unwrap().height, 0);
        assert!(cached.is_none());

        // in error: the cache is returned.
        storage.update_status(0, CertificateStatus::InError, None).await.unwrap();
        let (cert, cached) =
            storage.get_last_sent_certificate_header_with_proof_if_in_error().await.unwrap();
        assert!(cert.unwrap().status.is_in_error());
        assert_eq!(cached.unwrap(), proof());
    }

    #[tokio::test]
    async fn test_delete_cached_proof() {
        let storage = AggsenderStorage::from_database(setup_test_db().await);
        storage.save_certificate_header(header(0, CertificateStatus::InError)).await.unwrap();
        storage.save_aggchain_proof(0, proof()).await.unwrap();
        storage.delete_cached_proof(0).await.unwrap();

        let (_, cached) =
            storage.get_last_sent_certificate_header_with_proof_if_in_error().await.unwrap();
        assert!(cached.is_none());
    }
}
