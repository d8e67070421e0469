//! External Event Ingestor
//!
//! Inspects the receipts of one external block and reacts to logs emitted by
//! the monitored contracts:
//! - `Deposit` credits the depositor's balance on the appchain
//! - `Swap` prices the swap at a fixed rate and emits a mint payload for the
//!   destination chain, without touching local balances
//!
//! Undecodable logs are logged and skipped. They come from an untrusted
//! chain and must never abort a block.

use crate::config::{IngestorConfig, StorageFaultPolicy};
use crate::error::IngestError;
use crate::multichain::MultichainAccess;
use crate::payload::token_mint_payload;
use appchain_runtime::{
    BalanceStore, CreditError, ExternalBlock, ExternalBlockProcessor, ExternalTransaction,
    LedgerTx,
};
use contract_types::{DepositEvent, EventKind, SwapEvent};
use ethers::types::{Log, TransactionReceipt};
use ethers::utils::to_checksum;

/// Turns external chain events into ledger mutations and outbound payloads
pub struct ExternalEventIngestor<M> {
    access: M,
    config: IngestorConfig,
    balances: BalanceStore,
}

impl<M: MultichainAccess> ExternalEventIngestor<M> {
    /// Create an ingestor. `balances` must be the same store the ledger
    /// transition uses so both agree on account keys.
    pub fn new(access: M, config: IngestorConfig, balances: BalanceStore) -> Self {
        Self {
            access,
            config,
            balances,
        }
    }

    /// Fetch `block` and apply its events through `ledger`
    pub fn process_block<L: LedgerTx + ?Sized>(
        &self,
        block: &ExternalBlock,
        ledger: &mut L,
    ) -> Result<Vec<ExternalTransaction>, IngestError> {
        let body = self.access.eth_block(block)?;
        let receipts = self.access.eth_receipts(block)?;

        let external_txs = self.apply_receipts(block, &receipts, ledger)?;

        tracing::info!(
            "External block: chain={} n={} hash={:?} transactions={} receipts={}",
            block.chain_id,
            body.number.map(|n| n.as_u64()).unwrap_or(block.block_number),
            body.hash.unwrap_or_default(),
            body.transactions.len(),
            receipts.len()
        );

        Ok(external_txs)
    }

    /// Apply already fetched receipts of `block`, in order
    pub fn apply_receipts<L: LedgerTx + ?Sized>(
        &self,
        block: &ExternalBlock,
        receipts: &[TransactionReceipt],
        ledger: &mut L,
    ) -> Result<Vec<ExternalTransaction>, IngestError> {
        let mut external_txs = Vec::new();

        if self.config.monitored_contracts.is_empty() {
            return Ok(external_txs);
        }

        for receipt in receipts {
            for log in &receipt.logs {
                if !self.config.is_monitored(&log.address) || log.topics.len() < 2 {
                    continue;
                }

                match EventKind::from_signature(&log.topics[0]) {
                    Some(EventKind::Deposit) => self.apply_deposit(block, log, ledger)?,
                    Some(EventKind::Swap) => {
                        if let Some(tx) = self.apply_swap(block, log) {
                            external_txs.push(tx);
                        }
                    }
                    None => {
                        tracing::info!("Unhandled event signature: {:?}", log.topics[0]);
                    }
                }
            }
        }

        Ok(external_txs)
    }

    fn apply_deposit<L: LedgerTx + ?Sized>(
        &self,
        block: &ExternalBlock,
        log: &Log,
        ledger: &mut L,
    ) -> Result<(), IngestError> {
        let event = match DepositEvent::decode(log) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Failed to decode deposit event: {}", e);
                return Ok(());
            }
        };

        // Checksummed, as earlier deployments keyed deposit accounts
        let user = to_checksum(&event.user, None);

        match self.balances.credit(ledger, &user, &event.token, event.amount) {
            Ok(new_balance) => {
                tracing::info!(
                    "Processed deposit from external chain: chain={} user={} token={} amount={} new_balance={}",
                    block.chain_id,
                    user,
                    event.token,
                    event.amount,
                    new_balance
                );
                Ok(())
            }
            Err(CreditError::Overflow) => {
                tracing::error!(
                    "Deposit amount too large: {} {} for {}",
                    event.amount,
                    event.token,
                    user
                );
                Ok(())
            }
            Err(CreditError::Storage(e)) => match self.config.deposit_storage_faults {
                StorageFaultPolicy::Abort => Err(IngestError::Storage(e)),
                StorageFaultPolicy::SkipLog => {
                    tracing::error!("Failed to update balance for {}: {}", user, e);
                    Ok(())
                }
            },
        }
    }

    fn apply_swap(&self, block: &ExternalBlock, log: &Log) -> Option<ExternalTransaction> {
        let event = match SwapEvent::decode(log) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Failed to decode swap event: {}", e);
                return None;
            }
        };

        let amount_out =
            self.config
                .exchange_rates
                .swap_output(&event.token_in, &event.token_out, event.amount_in);

        tracing::info!(
            "Processed swap event from external chain: source_chain={} user={} {} {} -> {} {} target_chain={}",
            block.chain_id,
            to_checksum(&event.user, None),
            event.amount_in,
            event.token_in,
            amount_out,
            event.token_out,
            self.config.destination_chain_id
        );

        Some(ExternalTransaction {
            chain_id: self.config.destination_chain_id,
            tx: token_mint_payload(event.user, amount_out, &event.token_out),
        })
    }
}

impl<M: MultichainAccess> ExternalBlockProcessor for ExternalEventIngestor<M> {
    fn process_block(
        &self,
        block: &ExternalBlock,
        ledger: &mut dyn LedgerTx,
    ) -> anyhow::Result<Vec<ExternalTransaction>> {
        Ok(ExternalEventIngestor::process_block(self, block, ledger)?)
    }
}
