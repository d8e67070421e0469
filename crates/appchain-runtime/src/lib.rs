//! Appchain Runtime - deterministic ledger transition core
//!
//! This crate provides:
//! - The ledger store interface with in-memory and sled-backed stores
//! - Account key encoding and the balance read/modify/write primitive
//! - The transfer state transition and its receipts
//! - The batch processor driving transactions and external blocks through
//!   one write transaction

pub mod account;
pub mod balance;
pub mod batch;
pub mod error;
pub mod ledger;
pub mod memory_store;
pub mod persistence;
pub mod receipt;
pub mod state_transition;
pub mod transaction;

pub use account::AccountKeyEncoding;
pub use balance::{BalanceError, BalanceStore, CreditError};
pub use batch::{
    Batch, BatchOutcome, BatchProcessor, ExternalBlock, ExternalBlockProcessor,
    ExternalTransaction, NoExternalBlocks, Rejected,
};
pub use error::{BatchError, ProcessError, TransitionError};
pub use ledger::{LedgerRead, LedgerTx, StoreError, ACCOUNTS_BUCKET, RECEIPTS_BUCKET};
pub use memory_store::{MemoryLedger, MemoryRwTx};
pub use persistence::{SledLedger, SledRwTx};
pub use receipt::{Receipt, ReceiptError, ReceiptStatus, ReceiptStore};
pub use state_transition::{LedgerTransition, Processed};
pub use transaction::{HashDecodeError, Transaction, TxHash};

#[cfg(test)]
mod tests;
