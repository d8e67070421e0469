//! In-memory ledger store
//!
//! Used by tests and by anything that does not need durability. Committed
//! state sits behind a `RwLock`; a single writer at a time is enforced with
//! a mutex held by the open transaction.

use crate::ledger::{check_bucket, LedgerRead, LedgerTx, StoreError, TABLES};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

/// Thread-safe in-memory ledger
#[derive(Clone)]
pub struct MemoryLedger {
    /// Committed buckets
    buckets: Arc<RwLock<HashMap<&'static str, Bucket>>>,
    /// Writer lock
    writer: Arc<Mutex<()>>,
}

impl MemoryLedger {
    /// Create an empty ledger with all runtime buckets
    pub fn new() -> Self {
        let buckets = TABLES.iter().map(|name| (*name, Bucket::new())).collect();
        Self {
            buckets: Arc::new(RwLock::new(buckets)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Begin a read-write transaction. Blocks while another one is open.
    pub fn begin_rw(&self) -> MemoryRwTx<'_> {
        MemoryRwTx {
            ledger: self,
            _writer: self.writer.lock(),
            writes: BTreeMap::new(),
        }
    }

    /// Number of committed entries in a bucket
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map(|b| b.len()).unwrap_or(0)
    }

    /// Check if a bucket is empty
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerRead for MemoryLedger {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        check_bucket(bucket)?;
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }
}

/// Write transaction over a [`MemoryLedger`]
///
/// Dropping it without [`commit`](Self::commit) discards all writes.
pub struct MemoryRwTx<'a> {
    ledger: &'a MemoryLedger,
    _writer: MutexGuard<'a, ()>,
    writes: BTreeMap<(&'static str, Vec<u8>), Vec<u8>>,
}

impl MemoryRwTx<'_> {
    /// Publish all buffered writes at once
    pub fn commit(self) {
        let mut buckets = self.ledger.buckets.write();
        let count = self.writes.len();

        for ((bucket, key), value) in self.writes {
            buckets.entry(bucket).or_default().insert(key, value);
        }

        tracing::trace!("Committed {} writes to memory ledger", count);
    }

    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }
}

impl LedgerRead for MemoryRwTx<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let name = static_bucket(bucket)?;
        if let Some(value) = self.writes.get(&(name, key.to_vec())) {
            return Ok(Some(value.clone()));
        }
        self.ledger.get(bucket, key)
    }
}

impl LedgerTx for MemoryRwTx<'_> {
    fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let name = static_bucket(bucket)?;
        self.writes.insert((name, key.to_vec()), value.to_vec());
        Ok(())
    }
}

fn static_bucket(bucket: &str) -> Result<&'static str, StoreError> {
    TABLES
        .iter()
        .copied()
        .find(|name| *name == bucket)
        .ok_or_else(|| StoreError::UnknownBucket(bucket.to_string()))
}
