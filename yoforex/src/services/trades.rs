use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppResult;
use crate::models::{Trade, TradeSide};

const TRADE_COLUMNS: &str =
    "id, user_id, pair, side, strategy, entry_price, exit_price, size, opened_at, closed_at";

#[derive(Debug, Default)]
pub struct TradeFilter {
    pub strategy: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct NewTrade<'a> {
    pub pair: &'a str,
    pub side: TradeSide,
    pub strategy: Option<&'a str>,
    pub entry_price: &'a BigDecimal,
    pub size: &'a BigDecimal,
    pub opened_at: DateTime<Utc>,
}

pub async fn list(
    pool: &PgPool,
    user_id: i64,
    filter: &TradeFilter,
    offset: i64,
    per_page: i64,
) -> AppResult<Vec<Trade>> {
    let mut query_builder = sqlx::QueryBuilder::new(format!(
        "SELECT {} FROM trades WHERE user_id = ",
        TRADE_COLUMNS
    ));
    query_builder.push_bind(user_id);

    if let Some(strategy) = &filter.strategy {
        query_builder.push(" AND strategy = ");
        query_builder.push_bind(strategy.clone());
    }

    if let Some(from) = filter.from {
        query_builder.push(" AND opened_at >= ");
        query_builder.push_bind(from);
    }

    if let Some(to) = filter.to {
        query_builder.push(" AND opened_at <= ");
        query_builder.push_bind(to);
    }

    query_builder.push(" ORDER BY opened_at DESC, id DESC LIMIT ");
    query_builder.push_bind(per_page);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(offset);

    let trades = query_builder
        .build_query_as::<Trade>()
        .fetch_all(pool)
        .await?;

    Ok(trades)
}

pub async fn get(pool: &PgPool, id: i64, user_id: i64) -> AppResult<Option<Trade>> {
    let trade = sqlx::query_as::<_, Trade>(&format!(
        "SELECT {} FROM trades WHERE id = $1 AND user_id = $2",
        TRADE_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(trade)
}

pub async fn create(pool: &PgPool, user_id: i64, trade: &NewTrade<'_>) -> AppResult<Trade> {
    let created = sqlx::query_as::<_, Trade>(&format!(
        "INSERT INTO trades (user_id, pair, side, strategy, entry_price, size, opened_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        TRADE_COLUMNS
    ))
    .bind(user_id)
    .bind(trade.pair)
    .bind(trade.side)
    .bind(trade.strategy)
    .bind(trade.entry_price)
    .bind(trade.size)
    .bind(trade.opened_at)
    .fetch_one(pool)
    .await?;
    Ok(created)
}

/// Records the exit of an open trade. `None` if the trade does not exist,
/// belongs to someone else, or is already closed.
pub async fn close(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    exit_price: &BigDecimal,
    closed_at: DateTime<Utc>,
) -> AppResult<Option<Trade>> {
    let trade = sqlx::query_as::<_, Trade>(&format!(
        "UPDATE trades SET exit_price = $3, closed_at = $4
          WHERE id = $1 AND user_id = $2 AND closed_at IS NULL
          RETURNING {}",
        TRADE_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .bind(exit_price)
    .bind(closed_at)
    .fetch_optional(pool)
    .await?;
    Ok(trade)
}

pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM trades WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Closed trades of the user, optionally only those closed since `since`.
pub async fn closed_since(
    pool: &PgPool,
    user_id: i64,
    since: Option<DateTime<Utc>>,
) -> AppResult<Vec<Trade>> {
    let mut query_builder = sqlx::QueryBuilder::new(format!(
        "SELECT {} FROM trades WHERE closed_at IS NOT NULL AND exit_price IS NOT NULL AND user_id = ",
        TRADE_COLUMNS
    ));
    query_builder.push_bind(user_id);

    if let Some(since) = since {
        query_builder.push(" AND closed_at >= ");
        query_builder.push_bind(since);
    }

    query_builder.push(" ORDER BY closed_at ASC");

    let trades = query_builder
        .build_query_as::<Trade>()
        .fetch_all(pool)
        .await?;

    Ok(trades)
}
