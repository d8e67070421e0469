//! Appchain operator tool
//!
//! Applies batches to a sled-backed ledger in one atomic write transaction
//! and answers balance and receipt queries against it.

use anyhow::{Context, Result};
use appchain_runtime::{
    Batch, BatchProcessor, BalanceStore, LedgerTransition, ReceiptStore, SledLedger, TxHash,
};
use clap::{Parser, Subcommand};
use external_bridge::{ExternalEventIngestor, FixtureMultichainAccess};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::NodeConfig;

/// Appchain state-transition core
#[derive(Parser, Debug)]
#[command(name = "appchain")]
#[command(about = "Apply batches to the appchain ledger and inspect its state", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for the ledger (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a batch of transactions and external blocks, then commit
    Apply {
        /// JSON batch file
        #[arg(long)]
        batch: PathBuf,

        /// JSON file of external blocks and receipts to serve
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Print an account balance
    Balance {
        #[arg(long)]
        address: String,

        #[arg(long)]
        token: String,
    },
    /// Print the receipt of a transaction
    Receipt {
        /// Transaction hash, hex with or without 0x
        #[arg(long)]
        hash: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    match args.command {
        Command::Apply { batch, fixture } => apply(&config, &batch, fixture.as_deref()),
        Command::Balance { address, token } => balance(&config, &address, &token),
        Command::Receipt { hash } => receipt(&config, &hash),
    }
}

fn open_ledger(config: &NodeConfig) -> Result<SledLedger> {
    std::fs::create_dir_all(&config.data_dir)?;
    let ledger = SledLedger::open(&config.data_dir)
        .with_context(|| format!("failed to open ledger at {}", config.data_dir.display()))?;
    Ok(ledger)
}

/// Run one batch inside one write transaction
fn apply(config: &NodeConfig, batch_path: &Path, fixture: Option<&Path>) -> Result<()> {
    let data = std::fs::read(batch_path)
        .with_context(|| format!("failed to read batch {}", batch_path.display()))?;
    let batch: Batch = serde_json::from_slice(&data)
        .with_context(|| format!("failed to parse batch {}", batch_path.display()))?;

    let access = match fixture {
        Some(path) => FixtureMultichainAccess::load(path)?,
        None => FixtureMultichainAccess::new(),
    };

    let balances = BalanceStore::new(config.key_encoding);
    let ingestor = ExternalEventIngestor::new(access, config.ingestor.clone(), balances);
    let processor = BatchProcessor::new(LedgerTransition::new(balances), ingestor);

    let ledger = open_ledger(config)?;
    tracing::info!(
        "Applying batch: {} transactions, {} external blocks",
        batch.transactions.len(),
        batch.external_blocks.len()
    );

    let mut rw = ledger.begin_rw();
    // Dropping the transaction on error discards every write of the batch
    let outcome = processor.process_batch(&batch, &mut rw)?;
    let written = rw.commit()?;
    tracing::info!("Committed {} writes to {}", written, config.data_dir.display());

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn balance(config: &NodeConfig, address: &str, token: &str) -> Result<()> {
    let ledger = open_ledger(config)?;
    let balance = BalanceStore::new(config.key_encoding)
        .get(&ledger, address, token)?
        .unwrap_or_default();

    println!(
        "{}",
        serde_json::json!({
            "address": address,
            "token": token,
            "balance": balance.to_string(),
        })
    );
    Ok(())
}

fn receipt(config: &NodeConfig, hash: &str) -> Result<()> {
    let hash: TxHash = hash.parse()?;
    let ledger = open_ledger(config)?;

    match ReceiptStore.get(&ledger, &hash)? {
        Some(receipt) => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        None => anyhow::bail!("no receipt for {}", hash),
    }
}
