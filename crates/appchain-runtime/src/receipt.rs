//! Transaction receipts
//!
//! A receipt is the terminal record of one processed transaction. Receipts
//! are stored as JSON in the receipts bucket, keyed by the raw 32-byte hash,
//! and are never overwritten once written.

use crate::ledger::{LedgerRead, LedgerTx, StoreError, RECEIPTS_BUCKET};
use crate::transaction::{Transaction, TxHash};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Confirmed,
    Failed,
}

/// Outcome of one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub tx_status: ReceiptStatus,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub sender: String,
    /// Post-transfer balance, set on success only
    #[serde(default)]
    pub sender_balance: Option<U256>,
    pub receiver: String,
    /// Post-transfer balance, set on success only
    #[serde(default)]
    pub receiver_balance: Option<U256>,
    pub token: String,
    pub value: u64,
}

impl Receipt {
    /// Receipt for a transfer that was applied
    pub fn confirmed(
        hash: TxHash,
        tx: &Transaction,
        sender_balance: U256,
        receiver_balance: U256,
    ) -> Self {
        Self {
            tx_hash: hash,
            tx_status: ReceiptStatus::Confirmed,
            error_message: None,
            sender: tx.sender.clone(),
            sender_balance: Some(sender_balance),
            receiver: tx.receiver.clone(),
            receiver_balance: Some(receiver_balance),
            token: tx.token.clone(),
            value: tx.value,
        }
    }

    /// Receipt for a transfer that was rejected
    pub fn failed(hash: TxHash, tx: &Transaction, error: impl ToString) -> Self {
        Self {
            tx_hash: hash,
            tx_status: ReceiptStatus::Failed,
            error_message: Some(error.to_string()),
            sender: tx.sender.clone(),
            sender_balance: None,
            receiver: tx.receiver.clone(),
            receiver_balance: None,
            token: tx.token.clone(),
            value: tx.value,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.tx_status == ReceiptStatus::Confirmed
    }
}

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("receipt encoding: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Append-only receipt storage
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptStore;

impl ReceiptStore {
    /// Write a receipt unless one already exists for its hash.
    /// Returns `false` when an earlier receipt was kept.
    pub fn append<L: LedgerTx + ?Sized>(
        &self,
        ledger: &mut L,
        receipt: &Receipt,
    ) -> Result<bool, ReceiptError> {
        let key = receipt.tx_hash.as_bytes();
        if ledger.get(RECEIPTS_BUCKET, key)?.is_some() {
            tracing::warn!(
                "Receipt for {} already exists, keeping the original",
                receipt.tx_hash
            );
            return Ok(false);
        }

        let bytes = serde_json::to_vec(receipt)?;
        ledger.put(RECEIPTS_BUCKET, key, &bytes)?;
        Ok(true)
    }

    /// Look up the receipt for a hash
    pub fn get<L: LedgerRead + ?Sized>(
        &self,
        ledger: &L,
        hash: &TxHash,
    ) -> Result<Option<Receipt>, ReceiptError> {
        match ledger.get(RECEIPTS_BUCKET, hash.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
