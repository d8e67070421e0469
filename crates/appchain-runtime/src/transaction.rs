//! Transfer transactions and their caller-supplied hashes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors decoding a transaction hash
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HashDecodeError {
    #[error("invalid hex in transaction hash: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("transaction hash must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// 32-byte transaction identity, used to key receipts
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = HashDecodeError;

    /// Hex, with or without `0x`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)?;
        let hash: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashDecodeError::InvalidLength(bytes.len()))?;
        Ok(Self(hash))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A locally submitted token transfer
///
/// Immutable once submitted. The hash is supplied by the client and is not
/// derived from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub value: u64,
    pub receiver: String,
    pub token: String,
    #[serde(rename = "hash")]
    pub tx_hash: String,
}

impl Transaction {
    /// Decode the caller-supplied hash
    pub fn hash(&self) -> Result<TxHash, HashDecodeError> {
        self.tx_hash.parse()
    }
}
