use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{ensure_success, http_client};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct FinnhubClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinnhubArticle {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    /// Unix seconds.
    #[serde(default)]
    #[ts(type = "number")]
    pub datetime: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    #[ts(optional)]
    pub related: Option<String>,
}

impl FinnhubClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("Finnhub API key is not configured".to_string()))
    }

    pub async fn market_news(&self) -> AppResult<Vec<FinnhubArticle>> {
        let response = self
            .client
            .get(format!("{}/news", self.base_url))
            .query(&[("category", "general"), ("token", self.api_key()?)])
            .send()
            .await?;

        Ok(ensure_success("Finnhub", response).await?.json().await?)
    }

    pub async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<FinnhubArticle>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let response = self
            .client
            .get(format!("{}/company-news", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.api_key()?),
            ])
            .send()
            .await?;

        Ok(ensure_success("Finnhub", response).await?.json().await?)
    }
}
