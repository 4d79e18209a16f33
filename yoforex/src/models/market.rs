use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use ts_rs::TS;

use crate::errors::AppError;

/// Bases priced through the crypto provider rather than the FX one.
const CRYPTO_BASES: &[&str] = &["BTC", "ETH"];

/// A currency pair written as `BASE/QUOTE`, e.g. `EUR/USD` or `XAU/USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn is_crypto(&self) -> bool {
        CRYPTO_BASES.contains(&self.base.as_str())
    }
}

impl FromStr for Pair {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((base, quote)) = s.trim().split_once('/') else {
            return Err(AppError::BadRequest(format!(
                "Invalid pair '{}', expected BASE/QUOTE",
                s
            )));
        };

        let valid = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(AppError::BadRequest(format!(
                "Invalid pair '{}', expected BASE/QUOTE",
                s
            )));
        }

        Ok(Pair {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Pushed to live price subscribers.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, tag = "type")]
pub enum PriceEvent {
    Prices { data: HashMap<String, f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Quote {
    pub pair: String,
    pub price: f64,
    pub change: f64,
}

impl Quote {
    pub fn new(pair: &str, price: f64, change: f64) -> Self {
        Self {
            pair: pair.to_string(),
            price,
            change,
        }
    }
}
