use crate::SyncError;

use std::time::Duration;

/// Linear back-off for transient I/O errors. Exceeding the attempt cap is
/// fatal to the owning task.
#[derive(Debug, Clone, Copy)]
pub struct RetryHandler {
    /// The pause between attempts.
    pub retry_after_error_period: Duration,
    /// The maximum number of attempts before giving up.
    pub max_retry_attempts_after_error: u32,
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self {
            retry_after_error_period: Duration::from_secs(1),
            max_retry_attempts_after_error: 5,
        }
    }
}

impl RetryHandler {
    /// Sleeps before the next attempt, or fails the task once the attempt
    /// cap is reached.
    pub async fn handle(&self, operation: &'static str, attempts: u32) -> Result<(), SyncError> {
        if attempts >= self.max_retry_attempts_after_error {
            tracing::error!(target: "aggkit::sync", operation, attempts, "retry budget exhausted");
            return Err(SyncError::RetriesExhausted { operation, attempts });
        }
        tracing::warn!(target: "aggkit::sync", operation, attempts, "retrying after error");
        tokio::time::sleep(self.retry_after_error_period).await;
        Ok(())
    }
}
