//! Clients for the third-party HTTP APIs the service proxies.

pub mod coingecko;
pub mod exchangerate;
pub mod finnhub;
pub mod gemini;
pub mod twelvedata;
pub mod wati;

use std::time::Duration;

use crate::errors::{AppError, AppResult};

pub(crate) fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Turns a non-2xx response into an upstream error carrying its body.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Upstream(format!(
        "{} API error ({}): {}",
        service, status, body
    )))
}
