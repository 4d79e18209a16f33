use serde_json::Value;

use super::{ensure_success, http_client};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

/// CoinGecko identifies coins by id, not ticker.
fn coin_id(symbol: &str) -> Option<&'static str> {
    match symbol {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        _ => None,
    }
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn simple_price(&self, symbol: &str, vs_currency: &str) -> AppResult<f64> {
        let id = coin_id(symbol)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported coin '{}'", symbol)))?;
        let vs = vs_currency.to_ascii_lowercase();

        let response = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[("ids", id), ("vs_currencies", vs.as_str())])
            .send()
            .await?;
        let body: Value = ensure_success("CoinGecko", response).await?.json().await?;

        body.get(id)
            .and_then(|prices| prices.get(&vs))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                AppError::Upstream(format!("CoinGecko returned no {}/{} price", symbol, vs_currency))
            })
    }
}
