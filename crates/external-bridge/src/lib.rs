//! External Bridge - external chain event ingestion
//!
//! Handles the external chain side of the appchain:
//! - Fetching observed blocks and receipts through a multichain access
//! - Crediting deposits made on the monitored contracts
//! - Pricing swaps and producing mint payloads for the destination chain

pub mod config;
pub mod error;
pub mod ingestor;
pub mod multichain;
pub mod payload;
pub mod rates;

pub use config::{IngestorConfig, StorageFaultPolicy, ETHEREUM_SEPOLIA_CHAIN_ID};
pub use error::{ConfigError, FetchError, IngestError};
pub use ingestor::ExternalEventIngestor;
pub use multichain::{FixtureBlock, FixtureMultichainAccess, FixtureReceipt, MultichainAccess};
pub use payload::token_mint_payload;
pub use rates::ExchangeRates;

#[cfg(test)]
mod tests;
