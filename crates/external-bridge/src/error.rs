//! Bridge Errors

use appchain_runtime::StoreError;
use thiserror::Error;

/// Failures of the multichain access collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("block {block_number} on chain {chain_id} not available")]
    BlockNotFound { chain_id: u64, block_number: u64 },

    #[error("receipts for block {block_number} on chain {chain_id} not available")]
    ReceiptsNotFound { chain_id: u64, block_number: u64 },

    #[error("multichain access: {0}")]
    Backend(String),
}

/// Faults that abort ingestion of a block
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to fetch external block: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage fault while crediting deposit: {0}")]
    Storage(#[from] StoreError),
}

/// Invalid ingestor configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("exchange rate for {pair} must be finite and non-negative, got {rate}")]
    InvalidRate { pair: String, rate: f64 },

    #[error("exchange pair `{0}` is not of the form IN:OUT")]
    MalformedPair(String),
}
