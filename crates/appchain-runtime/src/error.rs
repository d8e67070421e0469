//! Runtime Errors

use crate::ledger::StoreError;
use crate::receipt::ReceiptError;
use crate::transaction::HashDecodeError;
use thiserror::Error;

/// Business-rule failures. These never escape as `Err`; their text ends up
/// in a failed receipt, where callers match on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("sender's balance not enough")]
    InsufficientBalance,

    #[error("receiver's balance overflow")]
    BalanceOverflow,
}

/// Faults that prevent a transaction from producing any receipt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    #[error("cannot key receipt: {0}")]
    InvalidHash(#[from] HashDecodeError),
}

/// Faults that abort a whole batch
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to store receipt: {0}")]
    Receipt(#[from] ReceiptError),

    #[error("storage fault: {0}")]
    Storage(#[from] StoreError),

    #[error("external block {chain_id}/{block_number}: {reason:#}")]
    ExternalBlock {
        chain_id: u64,
        block_number: u64,
        reason: anyhow::Error,
    },
}
