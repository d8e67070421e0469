//! Fixed exchange rates for swap pricing
//!
//! Rates are `f64` multipliers keyed by `"IN:OUT"`. The output of a swap is
//! `trunc(amount_in * rate)`, where the product is rounded to
//! `max(64, bitlen(amount_in))` significant bits (half to even) before
//! truncation. Receipts produced by earlier deployments were priced with
//! that arbitrary-precision float rule, so it is reproduced exactly here in
//! integer arithmetic.

use crate::error::ConfigError;
use ethers::types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum mantissa precision of the product
const MIN_PRECISION: usize = 64;

/// Rate table, keyed by `"IN:OUT"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRates(BTreeMap<String, f64>);

impl ExchangeRates {
    /// Empty table: every pair falls back to 1:1
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Set the rate for one direction of a pair
    pub fn with_rate(mut self, token_in: &str, token_out: &str, rate: f64) -> Self {
        self.insert(token_in, token_out, rate);
        self
    }

    pub fn insert(&mut self, token_in: &str, token_out: &str, rate: f64) {
        self.0.insert(pair_key(token_in, token_out), rate);
    }

    pub fn rate(&self, token_in: &str, token_out: &str) -> Option<f64> {
        self.0.get(&pair_key(token_in, token_out)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every key must be `IN:OUT` and every rate finite and non-negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (pair, rate) in &self.0 {
            match pair.split_once(':') {
                Some((a, b)) if !a.is_empty() && !b.is_empty() => {}
                _ => return Err(ConfigError::MalformedPair(pair.clone())),
            }
            if !rate.is_finite() || *rate < 0.0 {
                return Err(ConfigError::InvalidRate {
                    pair: pair.clone(),
                    rate: *rate,
                });
            }
        }
        Ok(())
    }

    /// Amount of `token_out` paid for `amount_in` of `token_in`.
    /// Unknown pairs trade 1:1.
    pub fn swap_output(&self, token_in: &str, token_out: &str, amount_in: U256) -> U256 {
        match self.rate(token_in, token_out) {
            Some(rate) => apply_rate(amount_in, rate),
            None => {
                tracing::warn!(
                    "Exchange rate not found for {}, using 1:1 rate",
                    pair_key(token_in, token_out)
                );
                amount_in
            }
        }
    }
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self::empty()
            .with_rate("ETH", "USDT", 4200.0)
            .with_rate("USDT", "ETH", 1.0 / 4200.0)
            .with_rate("BTC", "USDT", 60000.0)
            .with_rate("USDT", "BTC", 1.0 / 60000.0)
    }
}

fn pair_key(token_in: &str, token_out: &str) -> String {
    format!("{}:{}", token_in, token_out)
}

/// `trunc(amount * rate)` with the product rounded to
/// `max(64, bitlen(amount))` bits. Saturates at `U256::MAX`; non-finite or
/// negative rates yield zero.
pub fn apply_rate(amount: U256, rate: f64) -> U256 {
    if amount.is_zero() || !rate.is_finite() || rate <= 0.0 {
        return U256::zero();
    }

    // rate == mantissa * 2^exponent, exactly
    let (mantissa, exponent) = decompose(rate);
    let product = amount.full_mul(U256::from(mantissa));

    let precision = amount.bits().max(MIN_PRECISION);
    let (product, exponent) = round_to_precision(product, exponent, precision);

    let scaled = if exponent >= 0 {
        let shift = exponent as usize;
        if product.bits() + shift > 256 {
            return U256::MAX;
        }
        product << shift
    } else {
        let shift = exponent.unsigned_abs() as usize;
        if shift >= 512 {
            return U256::zero();
        }
        product >> shift
    };

    narrow(scaled)
}

/// Split a positive finite `f64` into an integer mantissa and a power of two
fn decompose(value: f64) -> (u64, i64) {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);

    if biased == 0 {
        // Subnormal
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    }
}

/// Round `value * 2^exponent` to `precision` significant bits, ties to even
fn round_to_precision(value: U512, exponent: i64, precision: usize) -> (U512, i64) {
    let len = value.bits();
    if len <= precision {
        return (value, exponent);
    }

    let shift = len - precision;
    let mut kept = value >> shift;
    let dropped = value & ((U512::one() << shift) - U512::one());
    let half = U512::one() << (shift - 1);

    if dropped > half || (dropped == half && kept.bit(0)) {
        kept += U512::one();
    }

    (kept, exponent + shift as i64)
}

fn narrow(value: U512) -> U256 {
    if value.bits() > 256 {
        return U256::MAX;
    }
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    #[test]
    fn test_default_pairs() {
        let rates = ExchangeRates::default();
        assert_eq!(rates.len(), 4);
        assert_eq!(rates.swap_output("ETH", "USDT", U256::from(2u64)), U256::from(8400u64));
        assert_eq!(
            rates.swap_output("BTC", "USDT", U256::from(3u64)),
            U256::from(180_000u64)
        );
        assert_eq!(rates.swap_output("ETH", "USDT", eth(1)), eth(4200));
    }

    #[test]
    fn test_inverse_rates_truncate() {
        let rates = ExchangeRates::default();
        // 4199 / 4200 rounds down to nothing
        assert_eq!(rates.swap_output("USDT", "ETH", U256::from(4199u64)), U256::zero());
        assert_eq!(
            rates.swap_output("USDT", "ETH", U256::from(8400u64)),
            U256::from(1u64)
        );
        assert_eq!(
            rates.swap_output("USDT", "BTC", U256::from(600_000u64)),
            U256::from(10u64)
        );
        // The rounded product of 4200 * (1/4200) lands just below one
        assert_eq!(rates.swap_output("USDT", "ETH", U256::from(4200u64)), U256::zero());
    }

    #[test]
    fn test_unknown_pair_is_one_to_one() {
        let rates = ExchangeRates::default();
        let amount = U256::from(12345u64);
        assert_eq!(rates.swap_output("DOGE", "USDT", amount), amount);
        assert_eq!(ExchangeRates::empty().swap_output("ETH", "USDT", amount), amount);
    }

    #[test]
    fn test_precision_boundary_above_64_bits() {
        // 2^64 + 1 has 65 significant bits, so the product keeps only 65:
        // 4200 * 2^64 + 4200 rounds to 4200 * 2^64 + 4096.
        let amount = (U256::one() << 64) + U256::one();
        let expected = U256::from(4200u64) * (U256::one() << 64) + U256::from(4096u64);
        assert_eq!(apply_rate(amount, 4200.0), expected);
    }

    #[test]
    fn test_round_half_to_even() {
        // 0b111 at 2 bits is a tie on an odd mantissa, so it rounds up
        let (kept, exp) = round_to_precision(U512::from(7u64), -1, 2);
        assert_eq!((kept, exp), (U512::from(4u64), 0));
        // 5 = 0b101 at 2 bits is a tie; 0b10 is even so it stays
        let (kept, exp) = round_to_precision(U512::from(5u64), 0, 2);
        assert_eq!((kept, exp), (U512::from(2u64), 1));
    }

    #[test]
    fn test_saturates_and_zero_rate() {
        assert_eq!(apply_rate(U256::MAX, 60000.0), U256::MAX);
        assert_eq!(apply_rate(U256::from(10u64), 0.0), U256::zero());
        assert_eq!(apply_rate(U256::zero(), 4200.0), U256::zero());
    }

    #[test]
    fn test_validate() {
        assert!(ExchangeRates::default().validate().is_ok());
        assert!(matches!(
            ExchangeRates::empty().with_rate("ETH", "USDT", -1.0).validate(),
            Err(ConfigError::InvalidRate { .. })
        ));
        assert!(matches!(
            ExchangeRates::empty()
                .with_rate("ETH", "USDT", f64::NAN)
                .validate(),
            Err(ConfigError::InvalidRate { .. })
        ));

        let malformed: ExchangeRates = serde_json::from_str(r#"{"ETHUSDT": 2.0}"#).unwrap();
        assert_eq!(
            malformed.validate(),
            Err(ConfigError::MalformedPair("ETHUSDT".to_string()))
        );
    }
}
