use serde::Deserialize;

use super::{ensure_success, http_client};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    client: reqwest::Client,
    base_url: String,
    access_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    result: Option<f64>,
}

impl ExchangeRateClient {
    pub fn new(base_url: &str, access_key: Option<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Value of one unit of `from` in `to`. Covers fiat pairs and metals
    /// such as XAU.
    pub async fn convert(&self, from: &str, to: &str) -> AppResult<f64> {
        let mut request = self
            .client
            .get(format!("{}/convert", self.base_url))
            .query(&[("from", from), ("to", to), ("amount", "1")]);
        if let Some(key) = self.access_key.as_deref() {
            request = request.query(&[("access_key", key)]);
        }

        let response = request.send().await?;
        let body: ConvertResponse = ensure_success("exchangerate.host", response)
            .await?
            .json()
            .await?;

        body.result
            .filter(|price| price.is_finite() && *price > 0.0)
            .ok_or_else(|| {
                AppError::Upstream(format!("exchangerate.host returned no {}/{} rate", from, to))
            })
    }
}
