use aggkit_primitives::RuntimeData;

/// An error produced while appending a decoded log to a block.
pub type AppendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a [`crate::BlockProcessor`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// An on-chain invariant was violated. The processor is halted: every
    /// subsequent call returns this same error until operator intervention.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    /// Any other processing error; the driver retries these.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ProcessorError {
    /// Wraps an arbitrary error as retryable.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }

    /// Returns true if the processor is halted.
    pub const fn is_inconsistent_state(&self) -> bool {
        matches!(self, Self::InconsistentState(_))
    }
}

/// An error that terminates a sync task.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The RPC client failed.
    #[error(transparent)]
    Client(#[from] aggkit_client::ClientError),
    /// The processor failed.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    /// An operation exhausted its retry budget.
    #[error("operation {operation} exhausted {attempts} retry attempts")]
    RetriesExhausted {
        /// The failing operation.
        operation: &'static str,
        /// The number of attempts performed.
        attempts: u32,
    },
    /// The stored runtime data does not match the live chain.
    #[error("storage is incompatible with the runtime: stored {stored:?}, live {live:?}")]
    IncompatibleStorage {
        /// The runtime data found in storage.
        stored: RuntimeData,
        /// The runtime data of the live chain.
        live: RuntimeData,
    },
    /// The reorg detector rejected the subscription.
    #[error("reorg detector error: {0}")]
    ReorgDetector(String),
    /// The operation was cancelled.
    #[error("cancelled")]
    Cancelled,
}
