use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::errors::AppResult;
use crate::models::{AlertEvent, Pair, PriceAlert};
use crate::pricing::PriceFeed;
use crate::services::alerts;

/// Polls untriggered alerts and fires the ones whose condition holds.
pub struct AlertMonitor {
    db_pool: PgPool,
    feed: Arc<dyn PriceFeed>,
    events: broadcast::Sender<AlertEvent>,
    interval: Duration,
}

/// Decimal form of a quoted price, using the shortest representation that
/// round-trips so `1.1` stays `1.1` rather than its binary expansion.
fn price_decimal(current: f64) -> Option<BigDecimal> {
    if !current.is_finite() {
        return None;
    }
    BigDecimal::from_str(&current.to_string()).ok()
}

/// Alerts satisfied by the given prices, paired with the price that
/// satisfied them. Alerts on unpriced pairs are left alone.
fn due_alerts(
    pending: Vec<PriceAlert>,
    prices: &HashMap<String, f64>,
) -> Vec<(PriceAlert, f64)> {
    pending
        .into_iter()
        .filter_map(|alert| {
            let current = *prices.get(&alert.pair)?;
            let price = price_decimal(current)?;
            alert.is_triggered_by(&price).then_some((alert, current))
        })
        .collect()
}

impl AlertMonitor {
    pub fn new(
        db_pool: PgPool,
        feed: Arc<dyn PriceFeed>,
        events: broadcast::Sender<AlertEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            db_pool,
            feed,
            events,
            interval,
        }
    }

    /// Runs one polling round. Returns the number of alerts fired.
    pub async fn check_once(&self) -> AppResult<usize> {
        let pending = alerts::pending(&self.db_pool).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut prices = HashMap::new();
        for alert in &pending {
            if prices.contains_key(&alert.pair) {
                continue;
            }
            let pair: Pair = match alert.pair.parse() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(alert_id = alert.id, error = %e, "Skipping alert with malformed pair");
                    continue;
                }
            };
            match self.feed.price(&pair).await {
                Ok(price) => {
                    prices.insert(alert.pair.clone(), price);
                }
                Err(e) => tracing::warn!(pair = %pair, error = %e, "Failed to price pair for alerts"),
            }
        }

        let mut fired = 0;
        for (alert, current) in due_alerts(pending, &prices) {
            let Some(price) = price_decimal(current) else {
                continue;
            };
            // Lost the race against a delete or another round.
            if !alerts::mark_triggered(&self.db_pool, alert.id, &price).await? {
                continue;
            }

            tracing::info!(
                alert_id = alert.id,
                pair = %alert.pair,
                current,
                "Price alert triggered"
            );
            let _ = self.events.send(AlertEvent::Alert {
                id: alert.id,
                user_id: alert.user_id,
                pair: alert.pair,
                current,
                target: alert.target,
                direction: alert.direction,
            });
            fired += 1;
        }

        Ok(fired)
    }

    pub async fn run(self, shutdown_token: CancellationToken) {
        tracing::info!("Alert monitor started");
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.check_once().await {
                        tracing::error!(error = %e, "Alert check failed");
                    }
                }
            }
        }

        tracing::info!("Alert monitor stopped");
    }
}
