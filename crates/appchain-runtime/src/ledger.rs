//! Ledger store interface
//!
//! The runtime never talks to a storage engine directly. Everything goes
//! through a write transaction handed in by the caller, which must give
//! read-your-writes semantics and commit atomically.

use thiserror::Error;

/// token+account -> balance
pub const ACCOUNTS_BUCKET: &str = "appaccounts";

/// tx hash -> receipt json
pub const RECEIPTS_BUCKET: &str = "receipts";

/// All buckets a ledger store must provide
pub const TABLES: [&str; 2] = [ACCOUNTS_BUCKET, RECEIPTS_BUCKET];

/// Storage-layer faults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown bucket {0}")]
    UnknownBucket(String),

    #[error("corrupt value in {bucket}: {reason}")]
    Corrupt { bucket: &'static str, reason: String },

    #[error("storage backend: {0}")]
    Backend(String),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<sled::transaction::TransactionError<()>> for StoreError {
    fn from(e: sled::transaction::TransactionError<()>) -> Self {
        match e {
            sled::transaction::TransactionError::Abort(()) => {
                StoreError::Backend("transaction aborted".to_string())
            }
            sled::transaction::TransactionError::Storage(e) => e.into(),
        }
    }
}

/// Read access to a ledger snapshot or transaction
pub trait LedgerRead {
    /// Get the value stored under `key`, `None` if absent
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
}

/// A read-write ledger transaction
///
/// Writes must be visible to subsequent reads through the same handle.
pub trait LedgerTx: LedgerRead {
    /// Store `value` under `key`, replacing any previous value
    fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}

pub(crate) fn check_bucket(bucket: &str) -> Result<(), StoreError> {
    if TABLES.contains(&bucket) {
        Ok(())
    } else {
        Err(StoreError::UnknownBucket(bucket.to_string()))
    }
}
