use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::middleware::NoOpMiddleware;
use governor::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drops per-user limiter entries whose quota has fully replenished.
pub struct LimiterSweep<C: Clock = DefaultClock> {
    limiter: Arc<RateLimiter<i64, DefaultKeyedStateStore<i64>, C, NoOpMiddleware<C::Instant>>>,
    interval: Duration,
}

impl<C: Clock> LimiterSweep<C> {
    pub fn new(limiter: Arc<RateLimiter<i64, DefaultKeyedStateStore<i64>, C, NoOpMiddleware<C::Instant>>>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Prunes idle keys. Returns the number of keys still tracked.
    pub fn sweep(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    pub async fn run(self, shutdown_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown_token.cancelled() => break,
                _ = interval.tick() => {
                    let tracked = self.sweep();
                    tracing::debug!(tracked, "Swept post rate limiter");
                }
            }
        }
    }
}
