use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::MarketConfig;
use crate::errors::AppResult;
use crate::integrations::coingecko::CoinGeckoClient;
use crate::integrations::exchangerate::ExchangeRateClient;
use crate::integrations::twelvedata::TwelveDataClient;
use crate::models::{Pair, Quote};

/// Source of the current price of a pair.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn price(&self, pair: &Pair) -> AppResult<f64>;
}

/// Crypto bases go to CoinGecko, fiat and metals to exchangerate.host.
#[derive(Debug, Clone)]
pub struct LivePriceFeed {
    crypto: CoinGeckoClient,
    fx: ExchangeRateClient,
}

impl LivePriceFeed {
    pub fn new(config: &MarketConfig) -> AppResult<Self> {
        Ok(Self {
            crypto: CoinGeckoClient::new(&config.coingecko_base_url, config.timeout_secs)?,
            fx: ExchangeRateClient::new(
                &config.exchangerate_base_url,
                config.exchangerate_api_key.clone(),
                config.timeout_secs,
            )?,
        })
    }
}

#[async_trait]
impl PriceFeed for LivePriceFeed {
    async fn price(&self, pair: &Pair) -> AppResult<f64> {
        if pair.is_crypto() {
            self.crypto.simple_price(&pair.base, &pair.quote).await
        } else {
            self.fx.convert(&pair.base, &pair.quote).await
        }
    }
}

/// Fixed quotes served when live data is unavailable or explicitly
/// requested.
pub fn mock_quotes() -> Vec<Quote> {
    vec![
        Quote::new("EUR/USD", 1.0852, 0.12),
        Quote::new("GBP/USD", 1.2678, -0.23),
        Quote::new("USD/JPY", 151.45, 0.45),
        Quote::new("AUD/USD", 0.6532, -0.12),
        Quote::new("USD/CAD", 1.3542, 0.08),
    ]
}

/// Quotes for the configured symbols, with the percent change measured
/// against the previous successful fetch.
#[derive(Debug, Clone)]
pub struct QuoteBoard {
    client: TwelveDataClient,
    symbols: Vec<String>,
    last_prices: Arc<RwLock<HashMap<String, f64>>>,
}

impl QuoteBoard {
    pub fn new(config: &MarketConfig) -> AppResult<Self> {
        Ok(Self {
            client: TwelveDataClient::new(
                &config.twelve_data_base_url,
                config.twelve_data_api_key.clone(),
                config.timeout_secs,
            )?,
            symbols: config.symbols.clone(),
            last_prices: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Never fails: any upstream problem degrades to [`mock_quotes`].
    pub async fn quotes(&self, use_mock: bool) -> Vec<Quote> {
        if use_mock || !self.client.is_configured() {
            return mock_quotes();
        }

        let prices = match self.client.prices(&self.symbols).await {
            Ok(prices) => prices,
            Err(e) => {
                tracing::warn!(error = %e, "Twelve Data request failed, serving mock quotes");
                return mock_quotes();
            }
        };

        if prices.is_empty() {
            tracing::warn!("No valid prices received from Twelve Data, serving mock quotes");
            return mock_quotes();
        }

        let mut last_prices = self.last_prices.write().await;
        prices
            .into_iter()
            .map(|(pair, price)| {
                let change = last_prices
                    .insert(pair.clone(), price)
                    .map(|previous| percent_change(previous, price))
                    .unwrap_or(0.0);
                Quote { pair, price, change }
            })
            .collect()
    }
}

fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let pct = (current - previous) / previous * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Keeps the quotes whose pair, slash removed, is in the comma separated
/// `pairs` list (case-insensitive).
pub fn filter_quotes(quotes: Vec<Quote>, pairs: Option<&str>) -> Vec<Quote> {
    let Some(pairs) = pairs.filter(|p| !p.trim().is_empty()) else {
        return quotes;
    };

    let wanted: Vec<String> = pairs
        .split(',')
        .map(|p| p.trim().replace('/', "").to_ascii_uppercase())
        .collect();

    quotes
        .into_iter()
        .filter(|q| wanted.contains(&q.pair.replace('/', "").to_ascii_uppercase()))
        .collect()
}

/// Prices every pair, skipping the ones that fail.
pub async fn snapshot(feed: &dyn PriceFeed, pairs: &[Pair]) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    for pair in pairs {
        match feed.price(pair).await {
            Ok(price) => {
                prices.insert(pair.to_string(), price);
            }
            Err(e) => tracing::debug!(pair = %pair, error = %e, "Skipping pair in snapshot"),
        }
    }
    prices
}
