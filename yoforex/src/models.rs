pub mod alert;
pub mod analysis;
pub mod forum;
pub mod market;
pub mod trade;
pub mod user;

pub use alert::{AlertDirection, AlertEvent, PriceAlert};
pub use analysis::{AnalysisRecord, ChartTimeframe, TradingStyle};
pub use forum::{ForumCategory, ForumComment, ForumPost};
pub use market::{Pair, PriceEvent, Quote};
pub use trade::{Trade, TradeSide, TradeView};
pub use user::{User, UserProfile};
