use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Type, TS)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum AlertDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, FromRow, TS)]
#[ts(export)]
pub struct PriceAlert {
    #[ts(type = "number")]
    pub id: i64,
    #[serde(skip)]
    #[ts(skip)]
    pub user_id: i64,
    pub pair: String,
    #[ts(type = "string")]
    pub target: BigDecimal,
    pub direction: AlertDirection,
    pub created_at: DateTime<Utc>,
    #[ts(optional)]
    pub triggered_at: Option<DateTime<Utc>>,
    #[ts(optional, type = "string")]
    pub triggered_price: Option<BigDecimal>,
}

impl PriceAlert {
    /// An `up` alert fires at or above the target, a `down` alert at or
    /// below it.
    pub fn is_triggered_by(&self, price: &BigDecimal) -> bool {
        match self.direction {
            AlertDirection::Up => *price >= self.target,
            AlertDirection::Down => *price <= self.target,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, tag = "type")]
pub enum AlertEvent {
    Alert {
        #[ts(type = "number")]
        id: i64,
        #[serde(skip)]
        #[ts(skip)]
        user_id: i64,
        pair: String,
        current: f64,
        #[ts(type = "string")]
        target: BigDecimal,
        direction: AlertDirection,
    },
}

impl AlertEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            AlertEvent::Alert { user_id, .. } => *user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn alert(target: &str, direction: AlertDirection) -> PriceAlert {
        PriceAlert {
            id: 1,
            user_id: 7,
            pair: "EUR/USD".into(),
            target: BigDecimal::from_str(target).unwrap(),
            direction,
            created_at: Utc::now(),
            triggered_at: None,
            triggered_price: None,
        }
    }

    #[test]
    fn up_alert_fires_at_or_above_target() {
        let a = alert("1.1000", AlertDirection::Up);
        assert!(!a.is_triggered_by(&BigDecimal::from_str("1.0999").unwrap()));
        assert!(a.is_triggered_by(&BigDecimal::from_str("1.1").unwrap()));
        assert!(a.is_triggered_by(&BigDecimal::from_str("1.2").unwrap()));
    }

    #[test]
    fn down_alert_fires_at_or_below_target() {
        let a = alert("150", AlertDirection::Down);
        assert!(a.is_triggered_by(&BigDecimal::from_str("149.5").unwrap()));
        assert!(a.is_triggered_by(&BigDecimal::from_str("150.00").unwrap()));
        assert!(!a.is_triggered_by(&BigDecimal::from_str("150.01").unwrap()));
    }

    #[test]
    fn event_serializes_without_owner() {
        let event = AlertEvent::Alert {
            id: 3,
            user_id: 9,
            pair: "XAU/USD".into(),
            current: 2400.5,
            target: BigDecimal::from(2400),
            direction: AlertDirection::Up,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "alert");
        assert_eq!(json["direction"], "up");
        assert!(json.get("user_id").is_none());
        assert_eq!(event.user_id(), 9);
    }
}
