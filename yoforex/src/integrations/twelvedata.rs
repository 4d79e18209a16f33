use serde_json::Value;

use super::{ensure_success, http_client};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct TwelveDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TwelveDataClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Latest price of each symbol. Symbols the API has no valid price for
    /// are left out.
    pub async fn prices(&self, symbols: &[String]) -> AppResult<Vec<(String, f64)>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AppError::Upstream(
                "Twelve Data API key is not configured".to_string(),
            ));
        };

        let response = self
            .client
            .get(format!("{}/price", self.base_url))
            .query(&[("symbol", symbols.join(",").as_str()), ("apikey", api_key)])
            .send()
            .await?;
        let body: Value = ensure_success("Twelve Data", response).await?.json().await?;

        Ok(parse_prices(symbols, &body))
    }
}

/// A usable price: finite and positive.
fn price_of(info: &Value) -> Option<f64> {
    let price = match info.get("price")? {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (price.is_finite() && price > 0.0).then_some(price)
}

/// A single-symbol request answers `{"price": ..}`; a batch answers
/// `{"EUR/USD": {"price": ..}, ..}`.
fn parse_prices(symbols: &[String], body: &Value) -> Vec<(String, f64)> {
    if let [symbol] = symbols {
        if let Some(price) = price_of(body) {
            return vec![(symbol.clone(), price)];
        }
    }

    let Some(map) = body.as_object() else {
        return Vec::new();
    };

    symbols
        .iter()
        .filter_map(|symbol| {
            let price = map.get(symbol).and_then(price_of)?;
            Some((symbol.clone(), price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_batch_response() {
        let body = json!({
            "EUR/USD": {"price": "1.08520"},
            "GBP/USD": {"price": ""},
            "USD/JPY": {"code": 400, "message": "bad symbol"},
        });
        let prices = parse_prices(&symbols(&["EUR/USD", "GBP/USD", "USD/JPY"]), &body);
        assert_eq!(prices, vec![("EUR/USD".to_string(), 1.0852)]);
    }

    #[test]
    fn parses_single_symbol_response() {
        let body = json!({"price": "151.45"});
        let prices = parse_prices(&symbols(&["USD/JPY"]), &body);
        assert_eq!(prices, vec![("USD/JPY".to_string(), 151.45)]);
    }

    #[test]
    fn single_symbol_needs_a_usable_price() {
        for body in [json!({"price": "NaN"}), json!({"price": "0"}), json!({"price": -1.5})] {
            assert!(parse_prices(&symbols(&["USD/JPY"]), &body).is_empty());
        }
    }
}
