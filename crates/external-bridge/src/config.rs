//! Ingestor configuration

use crate::error::ConfigError;
use crate::rates::ExchangeRates;
use contract_types::EXAMPLE_CONTRACT;
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Ethereum Sepolia
pub const ETHEREUM_SEPOLIA_CHAIN_ID: u64 = 11155111;

/// What to do when crediting a deposit hits a storage fault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFaultPolicy {
    /// Stop ingesting the block and return the fault
    #[default]
    Abort,
    /// Log the fault and move on to the next log
    SkipLog,
}

/// External Event Ingestor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestorConfig {
    /// Contracts whose logs are inspected. Empty disables ingestion.
    pub monitored_contracts: Vec<Address>,
    /// Chain that receives swap payouts
    pub destination_chain_id: u64,
    /// Fixed swap rates
    pub exchange_rates: ExchangeRates,
    pub deposit_storage_faults: StorageFaultPolicy,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            monitored_contracts: vec![EXAMPLE_CONTRACT],
            destination_chain_id: ETHEREUM_SEPOLIA_CHAIN_ID,
            exchange_rates: ExchangeRates::default(),
            deposit_storage_faults: StorageFaultPolicy::default(),
        }
    }
}

impl IngestorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.exchange_rates.validate()
    }

    pub fn is_monitored(&self, address: &Address) -> bool {
        self.monitored_contracts.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestorConfig::default();
        let contract = EXAMPLE_CONTRACT;

        assert_eq!(config.monitored_contracts, vec![contract]);
        assert!(config.is_monitored(&contract));
        assert_eq!(config.destination_chain_id, 11155111);
        assert_eq!(config.deposit_storage_faults, StorageFaultPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: IngestorConfig = serde_json::from_str(
            r#"{"destination_chain_id": 1, "deposit_storage_faults": "skip_log"}"#,
        )
        .unwrap();

        assert_eq!(config.destination_chain_id, 1);
        assert_eq!(config.deposit_storage_faults, StorageFaultPolicy::SkipLog);
        assert_eq!(config.exchange_rates, ExchangeRates::default());
        assert_eq!(config.monitored_contracts.len(), 1);
    }

    #[test]
    fn test_rates_from_json() {
        let config: IngestorConfig = serde_json::from_str(
            r#"{"monitored_contracts": [], "exchange_rates": {"ETH:DAI": 3000.5}}"#,
        )
        .unwrap();

        assert!(config.monitored_contracts.is_empty());
        assert_eq!(config.exchange_rates.rate("ETH", "DAI"), Some(3000.5));
        assert_eq!(config.exchange_rates.rate("ETH", "USDT"), None);
    }
}
