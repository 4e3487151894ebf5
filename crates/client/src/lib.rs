//! A narrow abstraction over an EVM JSON-RPC endpoint.
//!
//! Syncers only need a handful of calls (headers, logs, chain id), so the
//! [`EthClient`] trait keeps the surface small and mockable. Two backends are
//! provided: [`BasicClient`] over any [`alloy_provider::Provider`], and
//! [`OpClient`] which resolves the finalized and safe tags against an op-node
//! sidecar endpoint.

mod error;
pub use error::ClientError;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use alloy_primitives::{Address, Bytes};
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, Header, Log};
use alloy_provider::Provider;

/// The result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// The narrow EVM RPC surface used by the syncers.
#[async_trait::async_trait]
pub trait EthClient: Send + Sync {
    /// Returns the header for the given tag, `None` if the block is unknown.
    ///
    /// A block can temporarily disappear from the execution client during a
    /// reorg, so callers must treat `None` as transient.
    async fn header_by_tag(&self, tag: BlockNumberOrTag) -> ClientResult<Option<Header>>;

    /// Returns the header for the given block number.
    async fn header_by_number(&self, number: u64) -> ClientResult<Option<Header>> {
        self.header_by_tag(BlockNumberOrTag::Number(number)).await
    }

    /// Returns the logs matching the filter.
    async fn logs(&self, filter: &Filter) -> ClientResult<Vec<Log>>;

    /// Returns the chain id of the endpoint.
    async fn chain_id(&self) -> ClientResult<u64>;

    /// Returns the code deployed at the given address.
    async fn code_at(&self, address: Address) -> ClientResult<Bytes>;
}

/// An [`EthClient`] over a plain execution endpoint.
#[derive(Debug, Clone)]
pub struct BasicClient<P> {
    provider: P,
}

impl<P> BasicClient<P> {
    /// Returns a new instance of [`BasicClient`].
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl<P: Provider + Send + Sync> EthClient for BasicClient<P> {
    async fn header_by_tag(&self, tag: BlockNumberOrTag) -> ClientResult<Option<Header>> {
        Ok(self.provider.get_block(tag.into()).await?.map(|block| block.header))
    }

    async fn logs(&self, filter: &Filter) -> ClientResult<Vec<Log>> {
        Ok(self.provider.get_logs(filter).await?)
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn code_at(&self, address: Address) -> ClientResult<Bytes> {
        Ok(self.provider.get_code_at(address).await?)
    }
}

/// An [`EthClient`] for OP-stack chains.
///
/// The execution client of an OP-stack chain does not track the finalized and
/// safe heads itself; they are resolved against the rollup (op-node) sidecar
/// endpoint instead.
#[derive(Debug, Clone)]
pub struct OpClient<P, S> {
    execution: BasicClient<P>,
    sidecar: S,
}

impl<P, S> OpClient<P, S> {
    /// Returns a new instance of [`OpClient`].
    pub const fn new(execution: P, sidecar: S) -> Self {
        Self { execution: BasicClient::new(execution), sidecar }
    }
}

#[async_trait::async_trait]
impl<P, S> EthClient for OpClient<P, S>
where
    P: Provider + Send + Sync,
    S: Provider + Send + Sync,
{
    async fn header_by_tag(&self, tag: BlockNumberOrTag) -> ClientResult<Option<Header>> {
        match tag {
            BlockNumberOrTag::Finalized | BlockNumberOrTag::Safe => {
                Ok(self.sidecar.get_block(tag.into()).await?.map(|block| block.header))
            }
            _ => self.execution.header_by_tag(tag).await,
        }
    }

    async fn logs(&self, filter: &Filter) -> ClientResult<Vec<Log>> {
        self.execution.logs(filter).await
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        self.execution.chain_id().await
    }

    async fn code_at(&self, address: Address) -> ClientResult<Bytes> {
        self.execution.code_at(address).await
    }
}
