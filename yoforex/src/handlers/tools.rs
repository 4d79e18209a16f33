use crate::errors::{ApiResult, AppError, AppResult};
use axum::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

const DEFAULT_BALANCE: f64 = 10_000.0;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct PreTradeCalcRequest {
    pub entry: f64,
    pub stop: f64,
    pub risk_pct: f64,
    #[ts(optional)]
    pub balance: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq, TS)]
#[ts(export)]
pub struct PreTradeCalcResponse {
    pub risk_amount: f64,
    pub position_size: f64,
}

fn position_size(request: &PreTradeCalcRequest) -> AppResult<PreTradeCalcResponse> {
    let balance = request.balance.unwrap_or(DEFAULT_BALANCE);
    if !balance.is_finite() || balance <= 0.0 {
        return Err(AppError::BadRequest("Balance must be positive.".to_string()));
    }
    if !request.risk_pct.is_finite() || request.risk_pct <= 0.0 {
        return Err(AppError::BadRequest("Risk percent must be positive.".to_string()));
    }

    let stop_distance = (request.entry - request.stop).abs();
    if !stop_distance.is_finite() || stop_distance == 0.0 {
        return Err(AppError::BadRequest(
            "Entry and stop prices must differ.".to_string(),
        ));
    }

    let risk_amount = request.risk_pct / 100.0 * balance;
    Ok(PreTradeCalcResponse {
        risk_amount,
        position_size: risk_amount / stop_distance,
    })
}

pub async fn pretrade_calc(Json(request): Json<PreTradeCalcRequest>) -> ApiResult<PreTradeCalcResponse> {
    Ok(Json(position_size(&request)?))
}
