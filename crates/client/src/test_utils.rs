//! Common test helpers.

use crate::{ClientError, ClientResult, EthClient};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, Header, Log};
use std::{collections::HashMap, sync::Mutex};

/// Returns a header with the given number and pseudo-random hash derived from
/// the number, chained to its parent.
pub fn header(number: u64) -> Header {
    let hash = B256::from(U256::from(number) + U256::from(0xaa00_0000u64));
    let parent_hash = if number == 0 {
        B256::ZERO
    } else {
        B256::from(U256::from(number - 1) + U256::from(0xaa00_0000u64))
    };
    let mut header: Header = Header::default();
    header.hash = hash;
    header.inner.number = number;
    header.inner.parent_hash = parent_hash;
    header.inner.timestamp = number * 12;
    header
}

/// A scripted [`EthClient`] for tests.
#[derive(Debug, Default)]
pub struct MockEthClient {
    inner: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    chain_id: u64,
    latest: Vec<Header>,
    finalized: Vec<Header>,
    headers: HashMap<u64, Vec<Header>>,
    logs: Vec<Vec<Log>>,
    code: HashMap<Address, Bytes>,
}

impl MockEthClient {
    /// Returns a new mock with the given chain id.
    pub fn new(chain_id: u64) -> Self {
        Self { inner: Mutex::new(MockState { chain_id, ..Default::default() }) }
    }

    /// Queues a response for the latest header. Responses are consumed in
    /// order; the last one is sticky.
    pub fn push_latest(&self, header: Header) {
        self.inner.lock().unwrap().latest.push(header);
    }

    /// Queues a response for the finalized header.
    pub fn push_finalized(&self, header: Header) {
        self.inner.lock().unwrap().finalized.push(header);
    }

    /// Queues a response for a header at the given number. `None` is modeled
    /// by not queueing anything.
    pub fn push_header(&self, header: Header) {
        self.inner.lock().unwrap().headers.entry(header.inner.number).or_default().push(header);
    }

    /// Queues a response for the next log query.
    pub fn push_logs(&self, logs: Vec<Log>) {
        self.inner.lock().unwrap().logs.push(logs);
    }

    /// Sets the code returned for the given address.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.inner.lock().unwrap().code.insert(address, code);
    }

    fn next(queue: &mut Vec<Header>) -> Option<Header> {
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

#[async_trait::async_trait]
impl EthClient for MockEthClient {
    async fn header_by_tag(&self, tag: BlockNumberOrTag) -> ClientResult<Option<Header>> {
        let mut state = self.inner.lock().unwrap();
        let header = match tag {
            BlockNumberOrTag::Latest | BlockNumberOrTag::Pending => Self::next(&mut state.latest),
            BlockNumberOrTag::Finalized | BlockNumberOrTag::Safe => {
                Self::next(&mut state.finalized)
            }
            BlockNumberOrTag::Number(number) => {
                state.headers.get_mut(&number).and_then(|queue| Self::next(queue))
            }
            BlockNumberOrTag::Earliest => state.headers.get(&0).and_then(|q| q.first().cloned()),
        };
        Ok(header)
    }

    async fn logs(&self, _filter: &Filter) -> ClientResult<Vec<Log>> {
        let mut state = self.inner.lock().unwrap();
        if state.logs.is_empty() {
            return Ok(vec![]);
        }
        Ok(state.logs.remove(0))
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        let state = self.inner.lock().unwrap();
        if state.chain_id == 0 {
            return Err(ClientError::ChainIdUndefined);
        }
        Ok(state.chain_id)
    }

    async fn code_at(&self, address: Address) -> ClientResult<Bytes> {
        Ok(self.inner.lock().unwrap().code.get(&address).cloned().unwrap_or_default())
    }
}
