//! Account key encoding
//!
//! Balances are keyed by `(token, address)`. The historical layout is a plain
//! `token ++ address` concatenation, which external readers of the accounts
//! bucket depend on. It is ambiguous: `("USD", "Talice")` and
//! `("USDT", "alice")` map to the same key. Deployments that do not need
//! layout compatibility should use the length-prefixed form.

use serde::{Deserialize, Serialize};

/// How `(token, address)` pairs are turned into storage keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKeyEncoding {
    /// `token ++ address`
    #[default]
    Concatenated,
    /// `u32_be(len(token)) ++ token ++ address`
    LengthPrefixed,
}

impl AccountKeyEncoding {
    /// Encode the storage key for `address`'s balance of `token`
    pub fn account_key(self, address: &str, token: &str) -> Vec<u8> {
        match self {
            Self::Concatenated => {
                let mut key = Vec::with_capacity(token.len() + address.len());
                key.extend_from_slice(token.as_bytes());
                key.extend_from_slice(address.as_bytes());
                key
            }
            Self::LengthPrefixed => {
                let mut key = Vec::with_capacity(4 + token.len() + address.len());
                key.extend_from_slice(&(token.len() as u32).to_be_bytes());
                key.extend_from_slice(token.as_bytes());
                key.extend_from_slice(address.as_bytes());
                key
            }
        }
    }
}
