use chrono::{DateTime, Utc};
use core::fmt;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type, TS)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum TradingStyle {
    Scalp,
    Swing,
}

impl TradingStyle {
    /// Timeframes a chart may be submitted with for this style.
    pub fn timeframes(&self) -> &'static [ChartTimeframe] {
        match self {
            TradingStyle::Scalp => &[
                ChartTimeframe::M1,
                ChartTimeframe::M5,
                ChartTimeframe::M15,
                ChartTimeframe::M30,
                ChartTimeframe::H1,
            ],
            TradingStyle::Swing => &[ChartTimeframe::H1, ChartTimeframe::D1, ChartTimeframe::W1],
        }
    }

    pub fn accepts(&self, timeframe: ChartTimeframe) -> bool {
        self.timeframes().contains(&timeframe)
    }
}

impl fmt::Display for TradingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingStyle::Scalp => write!(f, "scalp"),
            TradingStyle::Swing => write!(f, "swing"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type, TS)]
#[sqlx(type_name = "text")]
#[ts(export)]
pub enum ChartTimeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    D1,
    W1,
}

impl fmt::Display for ChartTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

impl FromStr for ChartTimeframe {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

#[derive(Debug, Clone, Serialize, FromRow, TS)]
#[ts(export)]
pub struct AnalysisRecord {
    #[ts(type = "number")]
    pub id: i64,
    pub style: TradingStyle,
    pub timeframe: ChartTimeframe,
    pub analysis: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
