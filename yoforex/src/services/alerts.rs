use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::errors::AppResult;
use crate::models::{AlertDirection, PriceAlert};

const ALERT_COLUMNS: &str =
    "id, user_id, pair, target, direction, created_at, triggered_at, triggered_price";

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> AppResult<Vec<PriceAlert>> {
    let alerts = sqlx::query_as::<_, PriceAlert>(&format!(
        "SELECT {} FROM price_alerts WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        ALERT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(alerts)
}

pub async fn create(
    pool: &PgPool,
    user_id: i64,
    pair: &str,
    target: &BigDecimal,
    direction: AlertDirection,
) -> AppResult<PriceAlert> {
    let alert = sqlx::query_as::<_, PriceAlert>(&format!(
        "INSERT INTO price_alerts (user_id, pair, target, direction) VALUES ($1, $2, $3, $4) RETURNING {}",
        ALERT_COLUMNS
    ))
    .bind(user_id)
    .bind(pair)
    .bind(target)
    .bind(direction)
    .fetch_one(pool)
    .await?;
    Ok(alert)
}

/// Deletes the alert if `user_id` owns it. Returns whether a row went away.
pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM price_alerts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Alerts that have not fired yet.
pub async fn pending(pool: &PgPool) -> AppResult<Vec<PriceAlert>> {
    let alerts = sqlx::query_as::<_, PriceAlert>(&format!(
        "SELECT {} FROM price_alerts WHERE triggered_at IS NULL ORDER BY id",
        ALERT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    Ok(alerts)
}

/// Marks the alert fired. Returns false when it already fired or was
/// deleted in the meantime.
pub async fn mark_triggered(pool: &PgPool, id: i64, price: &BigDecimal) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE price_alerts SET triggered_at = NOW(), triggered_price = $2
          WHERE id = $1 AND triggered_at IS NULL",
    )
    .bind(id)
    .bind(price)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
