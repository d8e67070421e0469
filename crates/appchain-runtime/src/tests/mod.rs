//! Cross-component scenarios for the runtime

mod batch_test;

use crate::ledger::{LedgerRead, LedgerTx, StoreError};
use crate::transaction::Transaction;

/// Wraps a ledger transaction and injects storage faults
pub(crate) struct FaultyTx<'a, T: LedgerTx> {
    pub inner: &'a mut T,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl<'a, T: LedgerTx> FaultyTx<'a, T> {
    pub fn reads(inner: &'a mut T) -> Self {
        Self {
            inner,
            fail_reads: true,
            fail_writes: false,
        }
    }

    pub fn writes(inner: &'a mut T) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_writes: true,
        }
    }
}

impl<T: LedgerTx> LedgerRead for FaultyTx<'_, T> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Backend("injected read fault".to_string()));
        }
        self.inner.get(bucket, key)
    }
}

impl<T: LedgerTx> LedgerTx for FaultyTx<'_, T> {
    fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("injected write fault".to_string()));
        }
        self.inner.put(bucket, key, value)
    }
}

/// Transfer with a hash derived from `n`
pub(crate) fn transfer(n: u8, sender: &str, receiver: &str, token: &str, value: u64) -> Transaction {
    Transaction {
        sender: sender.to_string(),
        value,
        receiver: receiver.to_string(),
        token: token.to_string(),
        tx_hash: format!("0x{}", hex::encode([n; 32])),
    }
}
