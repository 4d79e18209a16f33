mod alert_monitor;
mod limiter_sweep;
mod price_ticker;

pub use alert_monitor::AlertMonitor;
pub use limiter_sweep::LimiterSweep;
pub use price_ticker::PriceTicker;
