use crate::AppendError;

use alloy_primitives::B256;
use alloy_rpc_types_eth::{Header, Log};
use std::{collections::HashMap, fmt};

/// The header of a downloaded block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EvmBlockHeader {
    /// The block number.
    pub num: u64,
    /// The block hash.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// The block timestamp.
    pub timestamp: u64,
}

impl From<&Header> for EvmBlockHeader {
    fn from(header: &Header) -> Self {
        Self {
            num: header.inner.number,
            hash: header.hash,
            parent_hash: header.inner.parent_hash,
            timestamp: header.inner.timestamp,
        }
    }
}

/// A downloaded block carrying the typed events decoded from its logs.
/// Blocks without events are emitted as checkpoints so downstream always
/// knows how far the chain has been scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmBlock<E> {
    /// The block header.
    pub header: EvmBlockHeader,
    /// Whether the block is at or below the configured finalized tag.
    pub is_finalized: bool,
    /// The decoded events of the block, in log order.
    pub events: Vec<E>,
}

impl<E> EvmBlock<E> {
    /// Returns an event-less checkpoint block.
    pub const fn empty(header: EvmBlockHeader, is_finalized: bool) -> Self {
        Self { header, is_finalized, events: Vec::new() }
    }
}

/// The appender invoked for a log's first topic, decoding it into the typed
/// event union of the syncer.
pub type LogAppender<E> =
    Box<dyn Fn(&EvmBlockHeader, &Log) -> Result<E, AppendError> + Send + Sync>;

/// Maps a log's first topic to its appender. Only logs whose first topic is
/// in the map are kept by the downloader.
pub struct LogAppenderMap<E> {
    appenders: HashMap<B256, LogAppender<E>>,
}

impl<E> Default for LogAppenderMap<E> {
    fn default() -> Self {
        Self { appenders: HashMap::new() }
    }
}

impl<E> LogAppenderMap<E> {
    /// Returns an empty appender map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an appender for the given event signature topic.
    pub fn insert(
        &mut self,
        topic: B256,
        appender: impl Fn(&EvmBlockHeader, &Log) -> Result<E, AppendError> + Send + Sync + 'static,
    ) {
        self.appenders.insert(topic, Box::new(appender));
    }

    /// Returns the appender for the topic, if registered.
    pub fn get(&self, topic: &B256) -> Option<&LogAppender<E>> {
        self.appenders.get(topic)
    }

    /// Returns true if an appender is registered for the topic.
    pub fn contains(&self, topic: &B256) -> bool {
        self.appenders.contains_key(topic)
    }

    /// The event signature topics being queried.
    pub fn topics(&self) -> Vec<B256> {
        self.appenders.keys().copied().collect()
    }
}

impl<E> fmt::Debug for LogAppenderMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogAppenderMap").field("topics", &self.topics()).finish()
    }
}
