use crate::app::AppState;
use crate::errors::{ApiResult, AppError, AppResult};
use crate::handlers::page_offset;
use crate::models::{Pair, TradeSide, TradeView};
use crate::performance::{self, PerformancePeriod, PerformanceStats};
use crate::security::AuthUser;
use crate::services::trades::{self, NewTrade, TradeFilter};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use ts_rs::TS;

const PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct TradesQuery {
    #[ts(optional)]
    pub strategy: Option<String>,
    #[ts(optional)]
    pub from_date: Option<DateTime<Utc>>,
    #[ts(optional)]
    pub to_date: Option<DateTime<Utc>>,
    #[ts(optional, type = "number")]
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateTradeRequest {
    pub pair: String,
    pub side: TradeSide,
    #[ts(optional)]
    pub strategy: Option<String>,
    #[ts(type = "number | string")]
    pub entry_price: BigDecimal,
    #[ts(type = "number | string")]
    pub size: BigDecimal,
    #[ts(optional)]
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CloseTradeRequest {
    #[ts(type = "number | string")]
    pub exit_price: BigDecimal,
    #[ts(optional)]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct PerformanceQuery {
    #[serde(default)]
    pub period: PerformancePeriod,
}

fn ensure_positive(value: &BigDecimal, field: &str) -> AppResult<()> {
    if *value <= BigDecimal::zero() {
        return Err(AppError::BadRequest(format!("{} must be positive.", field)));
    }
    Ok(())
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Trade with id '{}' not found", id))
}

pub async fn list_trades(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TradesQuery>,
) -> ApiResult<Vec<TradeView>> {
    let offset = page_offset(query.page.unwrap_or(1), PAGE_SIZE)?;

    let filter = TradeFilter {
        strategy: query.strategy.filter(|s| !s.trim().is_empty()),
        from: query.from_date,
        to: query.to_date,
    };

    let trades = trades::list(&state.db_pool, user.id, &filter, offset, PAGE_SIZE).await?;
    Ok(Json(trades.into_iter().map(TradeView::from).collect()))
}

pub async fn get_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<TradeView> {
    let trade = trades::get(&state.db_pool, id, user.id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(trade.into()))
}

pub async fn create_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateTradeRequest>,
) -> AppResult<(StatusCode, Json<TradeView>)> {
    let pair: Pair = request.pair.parse()?;
    ensure_positive(&request.entry_price, "Entry price")?;
    ensure_positive(&request.size, "Size")?;

    let pair = pair.to_string();
    let new_trade = NewTrade {
        pair: &pair,
        side: request.side,
        strategy: request.strategy.as_deref().filter(|s| !s.trim().is_empty()),
        entry_price: &request.entry_price,
        size: &request.size,
        opened_at: request.opened_at.unwrap_or_else(Utc::now),
    };

    let trade = trades::create(&state.db_pool, user.id, &new_trade).await?;
    Ok((StatusCode::CREATED, Json(trade.into())))
}

pub async fn close_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<CloseTradeRequest>,
) -> ApiResult<TradeView> {
    ensure_positive(&request.exit_price, "Exit price")?;

    let trade = trades::get(&state.db_pool, id, user.id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if trade.is_closed() {
        return Err(AppError::BadRequest("Trade is already closed.".to_string()));
    }

    let closed_at = request.closed_at.unwrap_or_else(Utc::now);
    if closed_at < trade.opened_at {
        return Err(AppError::BadRequest(
            "A trade cannot close before it opened.".to_string(),
        ));
    }

    let closed = trades::close(&state.db_pool, id, user.id, &request.exit_price, closed_at)
        .await?
        .ok_or_else(|| AppError::BadRequest("Trade is already closed.".to_string()))?;
    Ok(Json(closed.into()))
}

pub async fn delete_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !trades::delete(&state.db_pool, id, user.id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_performance(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<PerformanceStats> {
    let since = query.period.since(Utc::now());
    let closed = trades::closed_since(&state.db_pool, user.id, since).await?;
    Ok(Json(performance::summarize(&closed)))
}
