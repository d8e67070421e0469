//! Persistence Layer for Ledger State
//!
//! Uses sled embedded database to persist balances and receipts across
//! restarts. Each bucket is its own sled tree. A write transaction buffers
//! its writes and applies them to all trees in one sled transaction on
//! commit, so a batch is either fully on disk or not at all.

use crate::ledger::{LedgerRead, LedgerTx, StoreError, TABLES};
use parking_lot::{Mutex, MutexGuard};
use sled::transaction::TransactionResult;
use sled::{Db, Transactional, Tree};
use std::collections::BTreeMap;
use std::path::Path;

/// Persistent ledger backed by sled
pub struct SledLedger {
    /// Sled database instance
    db: Db,
    /// One tree per bucket, in `TABLES` order
    trees: Vec<Tree>,
    /// Writer lock
    writer: Mutex<()>,
}

impl SledLedger {
    /// Open or create a ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        // No background flusher: it would keep the database locked after
        // drop. Commits flush explicitly.
        let db = sled::Config::new()
            .path(path.as_ref())
            .flush_every_ms(None)
            .open()?;
        let trees = TABLES
            .iter()
            .map(|name| db.open_tree(name))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Opened ledger store at {:?}", path.as_ref());

        Ok(Self {
            db,
            trees,
            writer: Mutex::new(()),
        })
    }

    /// Begin a read-write transaction. Blocks while another one is open.
    pub fn begin_rw(&self) -> SledRwTx<'_> {
        SledRwTx {
            ledger: self,
            _writer: self.writer.lock(),
            writes: BTreeMap::new(),
        }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of committed entries in a bucket
    pub fn len(&self, bucket: &str) -> usize {
        self.tree_index(bucket)
            .map(|idx| self.trees[idx].len())
            .unwrap_or(0)
    }

    /// Check if a bucket is empty
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    fn tree_index(&self, bucket: &str) -> Result<usize, StoreError> {
        TABLES
            .iter()
            .position(|name| *name == bucket)
            .ok_or_else(|| StoreError::UnknownBucket(bucket.to_string()))
    }
}

impl LedgerRead for SledLedger {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let idx = self.tree_index(bucket)?;
        Ok(self.trees[idx].get(key)?.map(|v| v.to_vec()))
    }
}

/// Write transaction over a [`SledLedger`]
///
/// Dropping it without [`commit`](Self::commit) discards all writes.
pub struct SledRwTx<'a> {
    ledger: &'a SledLedger,
    _writer: MutexGuard<'a, ()>,
    /// (tree index, key) -> value
    writes: BTreeMap<(usize, Vec<u8>), Vec<u8>>,
}

impl SledRwTx<'_> {
    /// Apply all buffered writes atomically and flush
    pub fn commit(self) -> Result<usize, StoreError> {
        let count = self.writes.len();

        let result: TransactionResult<()> = self.ledger.trees.as_slice().transaction(|views| {
            for ((idx, key), value) in &self.writes {
                views[*idx].insert(key.as_slice(), value.as_slice())?;
            }
            Ok(())
        });
        result?;

        self.ledger.flush()?;
        tracing::debug!("Committed {} writes to ledger store", count);

        Ok(count)
    }

    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }
}

impl LedgerRead for SledRwTx<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let idx = self.ledger.tree_index(bucket)?;
        if let Some(value) = self.writes.get(&(idx, key.to_vec())) {
            return Ok(Some(value.clone()));
        }
        self.ledger.get(bucket, key)
    }
}

impl LedgerTx for SledRwTx<'_> {
    fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let idx = self.ledger.tree_index(bucket)?;
        self.writes.insert((idx, key.to_vec()), value.to_vec());
        Ok(())
    }
}
