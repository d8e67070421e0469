//! Ledger Transition
//!
//! Applies one locally submitted transfer to the sender's and receiver's
//! balances and produces its receipt. Business-rule and storage failures end
//! up in a failed receipt. Only a hash that cannot key a receipt is returned
//! as an error.

use crate::balance::{BalanceError, BalanceStore};
use crate::batch::ExternalTransaction;
use crate::error::{ProcessError, TransitionError};
use crate::ledger::LedgerTx;
use crate::receipt::Receipt;
use crate::transaction::{Transaction, TxHash};
use ethers::types::U256;

/// Result of processing a single transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub receipt: Receipt,
    /// Always empty for local transfers
    pub external_transactions: Vec<ExternalTransaction>,
}

impl Processed {
    fn receipt_only(receipt: Receipt) -> Self {
        Self {
            receipt,
            external_transactions: Vec::new(),
        }
    }
}

/// Transfer state transition
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerTransition {
    balances: BalanceStore,
}

impl LedgerTransition {
    pub fn new(balances: BalanceStore) -> Self {
        Self { balances }
    }

    pub fn balances(&self) -> BalanceStore {
        self.balances
    }

    /// Apply `tx` through `ledger`.
    ///
    /// Writes are made through the caller's transaction; a failed receipt
    /// after a partial write relies on the caller discarding that
    /// transaction.
    pub fn process<L: LedgerTx + ?Sized>(
        &self,
        tx: &Transaction,
        ledger: &mut L,
    ) -> Result<Processed, ProcessError> {
        let hash = tx.hash()?;
        let value = U256::from(tx.value);

        let sender_balance = match self.balances.get(&*ledger, &tx.sender, &tx.token) {
            Ok(Some(balance)) if balance >= value => balance,
            Ok(_) => {
                tracing::debug!(
                    "Rejecting {}: {} cannot cover {} {}",
                    hash,
                    tx.sender,
                    tx.value,
                    tx.token
                );
                return Ok(Processed::receipt_only(Receipt::failed(
                    hash,
                    tx,
                    TransitionError::InsufficientBalance,
                )));
            }
            Err(e) => {
                tracing::error!("Failed to read sender balance for {}: {}", hash, e);
                return Ok(Processed::receipt_only(Receipt::failed(hash, tx, e)));
            }
        };

        // Same account on both sides: nothing moves
        if self.balances.account_key(&tx.sender, &tx.token)
            == self.balances.account_key(&tx.receiver, &tx.token)
        {
            tracing::debug!("Self-transfer {} leaves {} untouched", hash, tx.sender);
            return Ok(Processed::receipt_only(Receipt::confirmed(
                hash,
                tx,
                sender_balance,
                sender_balance,
            )));
        }

        let receiver_balance = match self.balances.get(&*ledger, &tx.receiver, &tx.token) {
            Ok(balance) => balance.unwrap_or_default(),
            Err(e) => {
                tracing::error!("Failed to read receiver balance for {}: {}", hash, e);
                return Ok(Processed::receipt_only(Receipt::failed(hash, tx, e)));
            }
        };

        if receiver_balance.checked_add(value).is_none() {
            return Ok(Processed::receipt_only(Receipt::failed(
                hash,
                tx,
                TransitionError::BalanceOverflow,
            )));
        }

        let new_sender = match self.balances.debit(ledger, &tx.sender, &tx.token, value) {
            Ok(balance) => balance,
            Err(e) => return Ok(Processed::receipt_only(self.failure(tx, hash, e))),
        };
        let new_receiver = match self.balances.credit(ledger, &tx.receiver, &tx.token, value) {
            Ok(balance) => balance,
            Err(e) => return Ok(Processed::receipt_only(self.failure(tx, hash, e.into()))),
        };

        tracing::debug!(
            "Transferred {} {} from {} to {} ({})",
            tx.value,
            tx.token,
            tx.sender,
            tx.receiver,
            hash
        );

        Ok(Processed::receipt_only(Receipt::confirmed(
            hash,
            tx,
            new_sender,
            new_receiver,
        )))
    }

    fn failure(&self, tx: &Transaction, hash: TxHash, err: BalanceError) -> Receipt {
        match err {
            BalanceError::Insufficient => {
                Receipt::failed(hash, tx, TransitionError::InsufficientBalance)
            }
            BalanceError::Overflow => Receipt::failed(hash, tx, TransitionError::BalanceOverflow),
            BalanceError::Storage(e) => {
                tracing::error!("Failed to write balances for {}: {}", hash, e);
                Receipt::failed(hash, tx, e)
            }
        }
    }
}
