//! Batch Processor Scenarios
//!
//! Drives transactions and external blocks through one write transaction
//! with a stub external block processor standing in for the ingestor.

use std::cell::RefCell;

use ethers::types::U256;

use super::transfer;
use crate::{
    balance::BalanceStore,
    batch::{
        Batch, BatchProcessor, ExternalBlock, ExternalBlockProcessor, ExternalTransaction,
        NoExternalBlocks,
    },
    error::BatchError,
    ledger::LedgerTx,
    memory_store::MemoryLedger,
    persistence::SledLedger,
    receipt::ReceiptStore,
    state_transition::LedgerTransition,
};

/// Credits 1 unit of "EXT" to "bridge" per block and echoes the block number
#[derive(Default)]
struct StubExternal {
    seen: RefCell<Vec<u64>>,
    fail_on: Option<u64>,
}

impl ExternalBlockProcessor for StubExternal {
    fn process_block(
        &self,
        block: &ExternalBlock,
        ledger: &mut dyn LedgerTx,
    ) -> anyhow::Result<Vec<ExternalTransaction>> {
        if self.fail_on == Some(block.block_number) {
            anyhow::bail!("rpc unavailable");
        }
        self.seen.borrow_mut().push(block.block_number);
        BalanceStore::default().credit(ledger, "bridge", "EXT", U256::one())?;
        Ok(vec![ExternalTransaction {
            chain_id: block.chain_id,
            tx: block.block_number.to_be_bytes().to_vec(),
        }])
    }
}

fn block(number: u64) -> ExternalBlock {
    ExternalBlock {
        chain_id: 11155111,
        block_number: number,
        block_hash: [number as u8; 32],
    }
}

fn seed(ledger: &MemoryLedger, address: &str, token: &str, amount: u64) {
    let mut rw = ledger.begin_rw();
    BalanceStore::default()
        .set(&mut rw, address, token, U256::from(amount))
        .unwrap();
    rw.commit();
}

#[test]
fn test_batch_runs_transactions_then_blocks() {
    let ledger = MemoryLedger::new();
    seed(&ledger, "alice", "ETH", 10);

    let processor = BatchProcessor::new(LedgerTransition::default(), StubExternal::default());
    let batch = Batch {
        transactions: vec![
            transfer(1, "alice", "bob", "ETH", 4),
            transfer(2, "bob", "carol", "ETH", 5),
            transfer(3, "bob", "carol", "ETH", 4),
        ],
        external_blocks: vec![block(100), block(101)],
    };

    let mut rw = ledger.begin_rw();
    let outcome = processor.process_batch(&batch, &mut rw).unwrap();
    rw.commit();

    assert_eq!(outcome.receipts.len(), 3);
    assert_eq!(outcome.confirmed(), 2);
    assert!(!outcome.receipts[1].is_confirmed());
    assert_eq!(outcome.external_transactions.len(), 2);
    assert_eq!(outcome.external_transactions[1].tx, 101u64.to_be_bytes().to_vec());
    assert_eq!(*processor.external().seen.borrow(), vec![100, 101]);

    let balances = BalanceStore::default();
    assert_eq!(
        balances.get(&ledger, "carol", "ETH").unwrap(),
        Some(U256::from(4u64))
    );
    assert_eq!(
        balances.get(&ledger, "bridge", "EXT").unwrap(),
        Some(U256::from(2u64))
    );

    // Every receipt, failed ones included, is stored
    for tx in &batch.transactions {
        let hash = tx.hash().unwrap();
        assert!(ReceiptStore.get(&ledger, &hash).unwrap().is_some());
    }
}

#[test]
fn test_malformed_hash_is_rejected_not_fatal() {
    let ledger = MemoryLedger::new();
    seed(&ledger, "alice", "ETH", 10);

    let mut bad = transfer(1, "alice", "bob", "ETH", 4);
    bad.tx_hash = "0xnothex".to_string();
    let batch = Batch {
        transactions: vec![bad, transfer(2, "alice", "bob", "ETH", 3)],
        external_blocks: Vec::new(),
    };

    let processor = BatchProcessor::new(LedgerTransition::default(), NoExternalBlocks);
    let mut rw = ledger.begin_rw();
    let outcome = processor.process_batch(&batch, &mut rw).unwrap();

    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].hash, "0xnothex");
    assert_eq!(outcome.receipts.len(), 1);
    assert_eq!(outcome.receipts[0].sender_balance, Some(U256::from(7u64)));
}

#[test]
fn test_external_failure_aborts_batch() {
    let ledger = MemoryLedger::new();
    seed(&ledger, "alice", "ETH", 10);

    let processor = BatchProcessor::new(
        LedgerTransition::default(),
        StubExternal {
            fail_on: Some(101),
            ..Default::default()
        },
    );
    let batch = Batch {
        transactions: vec![transfer(1, "alice", "bob", "ETH", 4)],
        external_blocks: vec![block(100), block(101)],
    };

    {
        let mut rw = ledger.begin_rw();
        let err = processor.process_batch(&batch, &mut rw).unwrap_err();
        assert!(err.to_string().contains("rpc unavailable"), "{}", err);
        match err {
            BatchError::ExternalBlock {
                chain_id,
                block_number,
                ..
            } => {
                assert_eq!(chain_id, 11155111);
                assert_eq!(block_number, 101);
            }
            other => panic!("unexpected error: {}", other),
        }
        // Dropped without commit
    }

    let balances = BalanceStore::default();
    assert_eq!(
        balances.get(&ledger, "alice", "ETH").unwrap(),
        Some(U256::from(10u64))
    );
    assert_eq!(balances.get(&ledger, "bridge", "EXT").unwrap(), None);
}

#[test]
fn test_batch_without_external_processor() {
    let ledger = MemoryLedger::new();
    let processor = BatchProcessor::new(LedgerTransition::default(), NoExternalBlocks);
    let batch = Batch {
        transactions: Vec::new(),
        external_blocks: vec![block(1)],
    };

    let mut rw = ledger.begin_rw();
    assert!(matches!(
        processor.process_batch(&batch, &mut rw),
        Err(BatchError::ExternalBlock { .. })
    ));
}

#[test]
fn test_batch_on_sled_commits_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let processor = BatchProcessor::new(LedgerTransition::default(), StubExternal::default());
    let balances = BalanceStore::default();

    {
        let ledger = SledLedger::open(dir.path()).unwrap();
        let mut rw = ledger.begin_rw();
        balances
            .set(&mut rw, "alice", "USDT", U256::from(500u64))
            .unwrap();
        rw.commit().unwrap();

        let batch = Batch {
            transactions: vec![transfer(9, "alice", "bob", "USDT", 125)],
            external_blocks: vec![block(5)],
        };
        let mut rw = ledger.begin_rw();
        processor.process_batch(&batch, &mut rw).unwrap();
        rw.commit().unwrap();
    }

    let ledger = SledLedger::open(dir.path()).unwrap();
    assert_eq!(
        balances.get(&ledger, "bob", "USDT").unwrap(),
        Some(U256::from(125u64))
    );
    assert_eq!(
        balances.get(&ledger, "bridge", "EXT").unwrap(),
        Some(U256::one())
    );
    let hash = transfer(9, "alice", "bob", "USDT", 125).hash().unwrap();
    assert!(ReceiptStore.get(&ledger, &hash).unwrap().unwrap().is_confirmed());
}
