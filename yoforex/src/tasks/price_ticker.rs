use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::models::{Pair, PriceEvent};
use crate::pricing::{PriceFeed, snapshot};

/// Periodically prices the major pairs and broadcasts the snapshot to
/// live price subscribers.
pub struct PriceTicker {
    feed: Arc<dyn PriceFeed>,
    pairs: Vec<Pair>,
    events: broadcast::Sender<PriceEvent>,
    interval: Duration,
}

impl PriceTicker {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        pairs: Vec<Pair>,
        events: broadcast::Sender<PriceEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            pairs,
            events,
            interval,
        }
    }

    pub async fn tick(&self) -> PriceEvent {
        PriceEvent::Prices {
            data: snapshot(self.feed.as_ref(), &self.pairs).await,
        }
    }

    pub async fn run(self, shutdown_token: CancellationToken) {
        tracing::info!(pairs = self.pairs.len(), "Price ticker started");
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = interval.tick() => {
                    // Nobody listening is not an error.
                    if self.events.receiver_count() == 0 {
                        continue;
                    }
                    let event = self.tick().await;
                    let _ = self.events.send(event);
                }
            }
        }

        tracing::info!("Price ticker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, AppResult};
    use async_trait::async_trait;

    struct GoldOnly;

    #[async_trait]
    impl PriceFeed for GoldOnly {
        async fn price(&self, pair: &Pair) -> AppResult<f64> {
            if pair.base == "XAU" {
                Ok(2350.25)
            } else {
                Err(AppError::Upstream("unavailable".into()))
            }
        }
    }

    #[tokio::test]
    async fn broadcasts_snapshots_until_cancelled() {
        let (tx, mut rx) = broadcast::channel(8);
        let pairs = vec!["XAU/USD".parse().unwrap(), "EUR/USD".parse().unwrap()];
        let ticker = PriceTicker::new(Arc::new(GoldOnly), pairs, tx, Duration::from_millis(10));

        let token = CancellationToken::new();
        let handle = tokio::spawn(ticker.run(token.clone()));

        let event = rx.recv().await.unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "prices");
        assert_eq!(json["data"]["XAU/USD"], 2350.25);
        assert!(json["data"].get("EUR/USD").is_none());

        token.cancel();
        handle.await.unwrap();
    }
}
