//! Batch processing
//!
//! One ordered batch is processed inside one write transaction owned by the
//! caller: every local transaction goes through the ledger transition and
//! gets its receipt appended, then every external block goes through the
//! configured [`ExternalBlockProcessor`]. Committing (or discarding) the
//! transaction afterwards is up to the caller.

use crate::error::{BatchError, ProcessError};
use crate::ledger::LedgerTx;
use crate::receipt::{Receipt, ReceiptStore};
use crate::state_transition::LedgerTransition;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Descriptor of an externally observed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalBlock {
    pub chain_id: u64,
    pub block_number: u64,
    #[serde(with = "hex_bytes32")]
    pub block_hash: [u8; 32],
}

/// Outbound cross-chain transaction instruction. Produced here, never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTransaction {
    pub chain_id: u64,
    #[serde(with = "hex_vec")]
    pub tx: Vec<u8>,
}

/// Handles the external blocks of a batch
pub trait ExternalBlockProcessor {
    /// Apply one block's effects through `ledger` and return the outbound
    /// transactions it produced
    fn process_block(
        &self,
        block: &ExternalBlock,
        ledger: &mut dyn LedgerTx,
    ) -> anyhow::Result<Vec<ExternalTransaction>>;
}

/// Batches without external blocks need no processor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalBlocks;

impl ExternalBlockProcessor for NoExternalBlocks {
    fn process_block(
        &self,
        block: &ExternalBlock,
        _ledger: &mut dyn LedgerTx,
    ) -> anyhow::Result<Vec<ExternalTransaction>> {
        anyhow::bail!(
            "no external block processor configured for chain {}",
            block.chain_id
        )
    }
}

/// An ordered unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub external_blocks: Vec<ExternalBlock>,
}

/// A transaction that produced no receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    pub hash: String,
    pub reason: String,
}

/// Everything a batch produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub receipts: Vec<Receipt>,
    pub external_transactions: Vec<ExternalTransaction>,
    pub rejected: Vec<Rejected>,
}

impl BatchOutcome {
    pub fn confirmed(&self) -> usize {
        self.receipts.iter().filter(|r| r.is_confirmed()).count()
    }
}

/// Drives a batch through the ledger transition and external processor
pub struct BatchProcessor<P> {
    transition: LedgerTransition,
    receipts: ReceiptStore,
    external: P,
}

impl<P: ExternalBlockProcessor> BatchProcessor<P> {
    pub fn new(transition: LedgerTransition, external: P) -> Self {
        Self {
            transition,
            receipts: ReceiptStore,
            external,
        }
    }

    pub fn external(&self) -> &P {
        &self.external
    }

    /// Process `batch` in order through `ledger`.
    ///
    /// On `Err` the caller must discard the transaction.
    pub fn process_batch<L: LedgerTx>(
        &self,
        batch: &Batch,
        ledger: &mut L,
    ) -> Result<BatchOutcome, BatchError> {
        let mut outcome = BatchOutcome::default();

        for tx in &batch.transactions {
            let processed = match self.transition.process(tx, ledger) {
                Ok(processed) => processed,
                Err(ProcessError::InvalidHash(e)) => {
                    tracing::error!("Skipping transaction with hash {:?}: {}", tx.tx_hash, e);
                    outcome.rejected.push(Rejected {
                        hash: tx.tx_hash.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            self.receipts.append(ledger, &processed.receipt)?;
            outcome.receipts.push(processed.receipt);
            outcome
                .external_transactions
                .extend(processed.external_transactions);
        }

        for block in &batch.external_blocks {
            let produced = self.external.process_block(block, ledger).map_err(|reason| {
                BatchError::ExternalBlock {
                    chain_id: block.chain_id,
                    block_number: block.block_number,
                    reason,
                }
            })?;
            outcome.external_transactions.extend(produced);
        }

        tracing::info!(
            "Processed batch: {} receipts ({} confirmed), {} rejected, {} external blocks, {} outbound txs",
            outcome.receipts.len(),
            outcome.confirmed(),
            outcome.rejected.len(),
            batch.external_blocks.len(),
            outcome.external_transactions.len()
        );

        Ok(outcome)
    }
}

mod hex_bytes32 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(D::Error::custom)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected 32 bytes, got {}", bytes.len())))
    }
}

mod hex_vec {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(D::Error::custom)
    }
}
