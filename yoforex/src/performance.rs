use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::Trade;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PerformancePeriod {
    #[default]
    Week,
    Month,
    All,
}

impl PerformancePeriod {
    /// Earliest closing time included in the period.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            PerformancePeriod::Week => Some(now - Duration::days(7)),
            PerformancePeriod::Month => Some(now - Duration::days(30)),
            PerformancePeriod::All => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DayStat {
    pub day: String,
    pub net_pct: f64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_profit: f64,
    pub by_day: Vec<DayStat>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates closed trades. Open trades are ignored.
pub fn summarize(trades: &[Trade]) -> PerformanceStats {
    let mut total_trades = 0;
    let mut wins = 0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut by_day = [0.0_f64; 7];

    for trade in trades {
        let (Some(profit), Some(pnl_pct), Some(closed_at)) =
            (trade.profit(), trade.pnl_pct(), trade.closed_at)
        else {
            continue;
        };

        total_trades += 1;
        if profit > 0.0 {
            wins += 1;
            gross_profit += profit;
        } else {
            gross_loss += -profit;
        }

        by_day[closed_at.weekday().num_days_from_monday() as usize] += pnl_pct;
    }

    let win_rate = if total_trades == 0 {
        0.0
    } else {
        wins as f64 / total_trades as f64 * 100.0
    };

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        gross_profit
    };

    PerformanceStats {
        total_trades,
        win_rate: round2(win_rate),
        profit_factor: round2(profit_factor),
        total_profit: round2(gross_profit - gross_loss),
        by_day: WEEKDAYS
            .iter()
            .zip(by_day)
            .map(|(day, pnl)| DayStat {
                day: day.to_string(),
                net_pct: round2(pnl),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeSide;
    use bigdecimal::BigDecimal;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn closed(side: TradeSide, entry: &str, exit: &str, size: &str, closed_at: DateTime<Utc>) -> Trade {
        Trade {
            id: 1,
            user_id: 1,
            pair: "EUR/USD".into(),
            side,
            strategy: None,
            entry_price: BigDecimal::from_str(entry).unwrap(),
            exit_price: Some(BigDecimal::from_str(exit).unwrap()),
            size: BigDecimal::from_str(size).unwrap(),
            opened_at: closed_at - Duration::hours(1),
            closed_at: Some(closed_at),
        }
    }

    #[test]
    fn empty_journal() {
        let stats = summarize(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.by_day.len(), 7);
        assert_eq!(stats.by_day[0].day, "Mon");
        assert_eq!(stats.by_day[6].day, "Sun");
    }

    #[test]
    fn aggregates_wins_and_losses() {
        // 2025-01-06 is a Monday.
        let monday = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        let wednesday = monday + Duration::days(2);
        let trades = vec![
            closed(TradeSide::Long, "100", "110", "1", monday),
            closed(TradeSide::Short, "100", "95", "2", monday),
            closed(TradeSide::Long, "100", "95", "1", wednesday),
        ];

        let stats = summarize(&trades);
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.win_rate, 66.67);
        assert_eq!(stats.profit_factor, 4.0);
        assert_eq!(stats.total_profit, 15.0);
        assert_eq!(stats.by_day[0].net_pct, 15.0);
        assert_eq!(stats.by_day[2].net_pct, -5.0);
        assert_eq!(stats.by_day[4].net_pct, 0.0);
    }

    #[test]
    fn profit_factor_without_losses_is_gross_profit() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        let stats = summarize(&[closed(TradeSide::Long, "10", "12", "5", now)]);
        assert_eq!(stats.profit_factor, 10.0);
        assert_eq!(stats.win_rate, 100.0);
    }

    #[test]
    fn period_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap();
        assert_eq!(PerformancePeriod::Week.since(now), Some(now - Duration::days(7)));
        assert_eq!(PerformancePeriod::Month.since(now), Some(now - Duration::days(30)));
        assert_eq!(PerformancePeriod::All.since(now), None);
    }
}
