//! Multichain Access - external chain block and receipt source
//!
//! The ingestor never performs network I/O itself. It asks a
//! [`MultichainAccess`] for the body and receipts of a block it was told
//! about. [`FixtureMultichainAccess`] serves them from memory, optionally
//! loaded from a JSON fixture file.

use crate::error::FetchError;
use appchain_runtime::ExternalBlock;
use ethers::types::{Block, Log, Transaction, TransactionReceipt, H256, U64};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};

/// Source of external chain blocks and receipts
pub trait MultichainAccess {
    /// Fetch the block body
    fn eth_block(&self, block: &ExternalBlock) -> Result<Block<Transaction>, FetchError>;

    /// Fetch all receipts of the block, in transaction order
    fn eth_receipts(&self, block: &ExternalBlock) -> Result<Vec<TransactionReceipt>, FetchError>;
}

/// A receipt in a fixture file: only its hash and logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureReceipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub logs: Vec<Log>,
}

/// One block in a fixture file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureBlock {
    pub chain_id: u64,
    pub block_number: u64,
    #[serde(default)]
    pub block_hash: H256,
    #[serde(default)]
    pub receipts: Vec<FixtureReceipt>,
}

#[derive(Debug, Clone)]
struct StoredBlock {
    block: Block<Transaction>,
    receipts: Vec<TransactionReceipt>,
}

/// In-memory multichain access
#[derive(Debug, Clone, Default)]
pub struct FixtureMultichainAccess {
    blocks: HashMap<(u64, u64), StoredBlock>,
}

impl FixtureMultichainAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load blocks from a JSON array of [`FixtureBlock`]
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let blocks: Vec<FixtureBlock> = serde_json::from_slice(&data)?;

        let mut access = Self::new();
        for block in blocks {
            access.insert_fixture(block);
        }

        if access.is_empty() {
            tracing::warn!("Fixture file {} holds no external blocks", path.display());
            return Ok(access);
        }

        tracing::info!(
            "Loaded {} external blocks from {}",
            access.len(),
            path.display()
        );
        Ok(access)
    }

    /// Add a block built from a fixture entry
    pub fn insert_fixture(&mut self, fixture: FixtureBlock) {
        let block = Block::<Transaction> {
            hash: Some(fixture.block_hash),
            number: Some(U64::from(fixture.block_number)),
            ..Default::default()
        };

        let receipts = fixture
            .receipts
            .into_iter()
            .enumerate()
            .map(|(index, receipt)| TransactionReceipt {
                transaction_hash: receipt.transaction_hash,
                transaction_index: U64::from(index as u64),
                block_hash: Some(fixture.block_hash),
                block_number: Some(U64::from(fixture.block_number)),
                logs: receipt.logs,
                status: Some(U64::one()),
                ..Default::default()
            })
            .collect();

        self.insert(fixture.chain_id, fixture.block_number, block, receipts);
    }

    /// Add or replace a block and its receipts
    pub fn insert(
        &mut self,
        chain_id: u64,
        block_number: u64,
        block: Block<Transaction>,
        receipts: Vec<TransactionReceipt>,
    ) {
        self.blocks
            .insert((chain_id, block_number), StoredBlock { block, receipts });
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn stored(&self, block: &ExternalBlock) -> Option<&StoredBlock> {
        self.blocks.get(&(block.chain_id, block.block_number))
    }
}

impl MultichainAccess for FixtureMultichainAccess {
    fn eth_block(&self, block: &ExternalBlock) -> Result<Block<Transaction>, FetchError> {
        self.stored(block)
            .map(|stored| stored.block.clone())
            .ok_or(FetchError::BlockNotFound {
                chain_id: block.chain_id,
                block_number: block.block_number,
            })
    }

    fn eth_receipts(&self, block: &ExternalBlock) -> Result<Vec<TransactionReceipt>, FetchError> {
        self.stored(block)
            .map(|stored| stored.receipts.clone())
            .ok_or(FetchError::ReceiptsNotFound {
                chain_id: block.chain_id,
                block_number: block.block_number,
            })
    }
}
