use crate::{BlockProcessor, SyncError};

use aggkit_primitives::RuntimeData;

/// Checks on startup that the stored runtime identity of a syncer database
/// matches the live chain and contract set. Empty storage adopts the live
/// identity; a mismatch refuses to start when required, and only warns
/// otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityChecker {
    require_storage_content_compatibility: bool,
}

impl CompatibilityChecker {
    /// Returns a new instance of [`CompatibilityChecker`].
    pub const fn new(require_storage_content_compatibility: bool) -> Self {
        Self { require_storage_content_compatibility }
    }

    /// Runs the check against the processor's storage.
    pub async fn check<P: BlockProcessor>(
        &self,
        processor: &P,
        live: RuntimeData,
    ) -> Result<(), SyncError> {
        match processor.get_runtime_data().await? {
            None => {
                tracing::info!(target: "aggkit::sync", ?live, "empty storage, persisting runtime data");
                processor.set_runtime_data(live).await?;
                Ok(())
            }
            Some(stored) if stored == live => Ok(()),
            Some(stored) => {
                if self.require_storage_content_compatibility {
                    tracing::error!(target: "aggkit::sync", ?stored, ?live, "storage runtime data mismatch, refusing to start");
                    return Err(SyncError::IncompatibleStorage { stored, live });
                }
                tracing::warn!(target: "aggkit::sync", ?stored, ?live, "storage runtime data mismatch ignored by configuration");
                Ok(())
            }
        }
    }
}
