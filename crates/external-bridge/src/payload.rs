//! Outbound mint payloads
//!
//! The destination chain's AppChain contract mints `amount` of `token` to
//! `recipient` from a payload laid out as
//! `[recipient: 20 bytes][amount: 32 bytes big-endian][token name]`.

use ethers::types::{Address, U256};

/// Length of the fixed part of a mint payload
pub const MINT_PAYLOAD_HEADER_LEN: usize = 20 + 32;

/// Build the mint payload for a swap output
pub fn token_mint_payload(recipient: Address, amount: U256, token: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MINT_PAYLOAD_HEADER_LEN + token.len());
    payload.extend_from_slice(recipient.as_bytes());

    let mut amount_bytes = [0u8; 32];
    amount.to_big_endian(&mut amount_bytes);
    payload.extend_from_slice(&amount_bytes);

    payload.extend_from_slice(token.as_bytes());
    payload
}
