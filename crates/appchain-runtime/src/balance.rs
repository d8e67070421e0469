//! Balance read/modify/write primitive
//!
//! The one place that knows how balances are keyed and encoded. Both the
//! ledger transition and the external event ingestor go through it.

use crate::account::AccountKeyEncoding;
use crate::ledger::{LedgerRead, LedgerTx, StoreError, ACCOUNTS_BUCKET};
use ethers::types::U256;
use thiserror::Error;

/// Failures of a balance mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("balance not enough")]
    Insufficient,

    #[error("balance overflow")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Failures of a credit. A credit never lacks funds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreditError {
    #[error("balance overflow")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<CreditError> for BalanceError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::Overflow => BalanceError::Overflow,
            CreditError::Storage(e) => BalanceError::Storage(e),
        }
    }
}

/// Balance accessor over any ledger transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceStore {
    encoding: AccountKeyEncoding,
}

impl BalanceStore {
    pub fn new(encoding: AccountKeyEncoding) -> Self {
        Self { encoding }
    }

    /// Storage key of `address`'s `token` balance
    pub fn account_key(&self, address: &str, token: &str) -> Vec<u8> {
        self.encoding.account_key(address, token)
    }

    /// Read a balance. `None` means no entry exists.
    pub fn get<L: LedgerRead + ?Sized>(
        &self,
        ledger: &L,
        address: &str,
        token: &str,
    ) -> Result<Option<U256>, StoreError> {
        let key = self.account_key(address, token);
        match ledger.get(ACCOUNTS_BUCKET, &key)? {
            Some(bytes) => decode_balance(&bytes),
            None => Ok(None),
        }
    }

    /// Overwrite a balance
    pub fn set<L: LedgerTx + ?Sized>(
        &self,
        ledger: &mut L,
        address: &str,
        token: &str,
        balance: U256,
    ) -> Result<(), StoreError> {
        let key = self.account_key(address, token);
        ledger.put(ACCOUNTS_BUCKET, &key, &encode_balance(balance))
    }

    /// Add `amount` to a balance, treating a missing entry as zero.
    /// Returns the new balance.
    pub fn credit<L: LedgerTx + ?Sized>(
        &self,
        ledger: &mut L,
        address: &str,
        token: &str,
        amount: U256,
    ) -> Result<U256, CreditError> {
        let current = self.get(&*ledger, address, token)?.unwrap_or_default();
        let updated = current.checked_add(amount).ok_or(CreditError::Overflow)?;
        self.set(ledger, address, token, updated)?;
        Ok(updated)
    }

    /// Subtract `amount` from a balance. A missing entry is insufficient,
    /// whatever the amount. Returns the new balance.
    pub fn debit<L: LedgerTx + ?Sized>(
        &self,
        ledger: &mut L,
        address: &str,
        token: &str,
        amount: U256,
    ) -> Result<U256, BalanceError> {
        let current = self
            .get(&*ledger, address, token)?
            .ok_or(BalanceError::Insufficient)?;
        let updated = current.checked_sub(amount).ok_or(BalanceError::Insufficient)?;
        self.set(ledger, address, token, updated)?;
        Ok(updated)
    }
}

/// Fixed-width 32-byte big-endian
pub fn encode_balance(balance: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    balance.to_big_endian(&mut bytes);
    bytes
}

/// Accepts any big-endian value up to 32 bytes. Empty values read as absent.
pub fn decode_balance(bytes: &[u8]) -> Result<Option<U256>, StoreError> {
    match bytes.len() {
        0 => Ok(None),
        1..=32 => Ok(Some(U256::from_big_endian(bytes))),
        n => Err(StoreError::Corrupt {
            bucket: ACCOUNTS_BUCKET,
            reason: format!("balance is {} bytes", n),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryLedger;

    #[test]
    fn test_missing_entry() {
        let ledger = MemoryLedger::new();
        let balances = BalanceStore::default();
        let mut tx = ledger.begin_rw();

        assert_eq!(balances.get(&tx, "alice", "USDT").unwrap(), None);
        assert_eq!(
            balances.debit(&mut tx, "alice", "USDT", U256::zero()),
            Err(BalanceError::Insufficient)
        );
        assert_eq!(
            balances.credit(&mut tx, "alice", "USDT", U256::from(5u64)).unwrap(),
            U256::from(5u64)
        );
    }

    #[test]
    fn test_credit_then_debit() {
        let ledger = MemoryLedger::new();
        let balances = BalanceStore::default();
        let mut tx = ledger.begin_rw();

        balances.credit(&mut tx, "bob", "BTC", U256::from(100u64)).unwrap();
        balances.credit(&mut tx, "bob", "BTC", U256::from(20u64)).unwrap();
        assert_eq!(
            balances.debit(&mut tx, "bob", "BTC", U256::from(120u64)).unwrap(),
            U256::zero()
        );

        // Drained accounts keep an entry holding zero
        assert_eq!(balances.get(&tx, "bob", "BTC").unwrap(), Some(U256::zero()));
        assert_eq!(
            balances.debit(&mut tx, "bob", "BTC", U256::one()),
            Err(BalanceError::Insufficient)
        );
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let ledger = MemoryLedger::new();
        let balances = BalanceStore::default();
        let mut tx = ledger.begin_rw();

        balances.set(&mut tx, "eve", "ETH", U256::MAX).unwrap();
        assert_eq!(
            balances.credit(&mut tx, "eve", "ETH", U256::one()),
            Err(CreditError::Overflow)
        );
        assert_eq!(balances.get(&tx, "eve", "ETH").unwrap(), Some(U256::MAX));
    }

    #[test]
    fn test_credit_error_widens_to_balance_error() {
        assert_eq!(BalanceError::from(CreditError::Overflow), BalanceError::Overflow);
        assert_eq!(
            BalanceError::from(CreditError::Storage(StoreError::Backend("disk".into()))),
            BalanceError::Storage(StoreError::Backend("disk".into()))
        );
    }

    #[test]
    fn test_decode_legacy_and_corrupt_values() {
        assert_eq!(decode_balance(&[]).unwrap(), None);
        assert_eq!(decode_balance(&[0x01, 0x00]).unwrap(), Some(U256::from(256u64)));
        assert_eq!(
            decode_balance(&encode_balance(U256::from(42u64))).unwrap(),
            Some(U256::from(42u64))
        );
        assert!(matches!(
            decode_balance(&[1u8; 33]),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_encoding_is_used_for_keys() {
        let ledger = MemoryLedger::new();
        let plain = BalanceStore::new(AccountKeyEncoding::Concatenated);
        let prefixed = BalanceStore::new(AccountKeyEncoding::LengthPrefixed);
        let mut tx = ledger.begin_rw();

        plain.credit(&mut tx, "Talice", "USD", U256::from(7u64)).unwrap();
        assert_eq!(plain.get(&tx, "alice", "USDT").unwrap(), Some(U256::from(7u64)));
        assert_eq!(prefixed.get(&tx, "alice", "USDT").unwrap(), None);
    }
}
