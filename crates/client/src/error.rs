use alloy_json_rpc::RpcError;
use alloy_transport::TransportErrorKind;

/// An error returned by an [`crate::EthClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying transport failed.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The endpoint returned an undefined chain id.
    #[error("chain id is undefined")]
    ChainIdUndefined,
    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}
