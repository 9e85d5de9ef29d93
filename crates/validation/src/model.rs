//! Ledger-side inputs handed to validation plugins

use crate::state::StateFetcher;
use std::any::Any;
use std::sync::Arc;

/// Header fields validators rely on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub previous_hash: Vec<u8>,
    pub data_hash: Vec<u8>,
}

/// Serialized transactions of a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockData {
    pub data: Vec<Vec<u8>>,
}

/// Block under validation. Either part may be missing in malformed input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub header: Option<BlockHeader>,
    pub data: Option<BlockData>,
}

impl Block {
    pub fn new(number: u64, transactions: Vec<Vec<u8>>) -> Self {
        Self {
            header: Some(BlockHeader {
                number,
                ..Default::default()
            }),
            data: Some(BlockData { data: transactions }),
        }
    }
}

/// Per-transaction data passed alongside the block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextDatum {
    /// Endorsement policy of the namespace, opaque to the chain
    SerializedPolicy(Vec<u8>),
    Other(Vec<u8>),
}

/// Services injected into plugins at initialization
#[derive(Clone)]
pub enum Dependency {
    StateFetcher(Arc<dyn StateFetcher>),
    Other(Arc<dyn Any + Send + Sync>),
}

impl Dependency {
    pub fn as_state_fetcher(&self) -> Option<Arc<dyn StateFetcher>> {
        match self {
            Dependency::StateFetcher(fetcher) => Some(Arc::clone(fetcher)),
            Dependency::Other(_) => None,
        }
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::StateFetcher(_) => f.write_str("Dependency::StateFetcher"),
            Dependency::Other(_) => f.write_str("Dependency::Other"),
        }
    }
}
