//! Node Configuration

use anyhow::Context;
use appchain_runtime::AccountKeyEncoding;
use external_bridge::IngestorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Directory of the sled ledger
    pub data_dir: PathBuf,
    /// Account key layout. Must never change for an existing ledger.
    pub key_encoding: AccountKeyEncoding,
    /// External event ingestion
    pub ingestor: IngestorConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            key_encoding: AccountKeyEncoding::default(),
            ingestor: IngestorConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.ingestor.validate()?;
        Ok(config)
    }
}
