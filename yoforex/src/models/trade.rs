use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type, TS)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    fn sign(&self) -> BigDecimal {
        match self {
            TradeSide::Long => BigDecimal::from(1),
            TradeSide::Short => BigDecimal::from(-1),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Trade {
    pub id: i64,
    pub user_id: i64,
    pub pair: String,
    pub side: TradeSide,
    pub strategy: Option<String>,
    pub entry_price: BigDecimal,
    pub exit_price: Option<BigDecimal>,
    pub size: BigDecimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some() && self.closed_at.is_some()
    }

    /// Percent move in the trade's favour, `None` while open.
    pub fn pnl_pct(&self) -> Option<f64> {
        let exit = self.exit_price.as_ref()?;
        if self.entry_price.is_zero() {
            return None;
        }
        let pct = (exit - &self.entry_price) * self.side.sign() * BigDecimal::from(100)
            / &self.entry_price;
        pct.to_f64()
    }

    /// Profit in quote currency, `None` while open.
    pub fn profit(&self) -> Option<f64> {
        let exit = self.exit_price.as_ref()?;
        ((exit - &self.entry_price) * &self.size * self.side.sign()).to_f64()
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct TradeView {
    #[ts(type = "number")]
    pub id: i64,
    pub pair: String,
    pub side: TradeSide,
    #[ts(optional)]
    pub strategy: Option<String>,
    #[ts(type = "string")]
    pub entry_price: BigDecimal,
    #[ts(optional, type = "string")]
    pub exit_price: Option<BigDecimal>,
    #[ts(type = "string")]
    pub size: BigDecimal,
    #[ts(optional)]
    pub pnl_pct: Option<f64>,
    #[ts(optional)]
    pub profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
    #[ts(optional)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Trade> for TradeView {
    fn from(trade: Trade) -> Self {
        let pnl_pct = trade.pnl_pct();
        let profit = trade.profit();
        Self {
            id: trade.id,
            pair: trade.pair,
            side: trade.side,
            strategy: trade.strategy,
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            size: trade.size,
            pnl_pct,
            profit,
            opened_at: trade.opened_at,
            closed_at: trade.closed_at,
        }
    }
}
