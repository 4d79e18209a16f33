use sqlx::PgPool;

use crate::errors::AppResult;
use crate::models::{AnalysisRecord, ChartTimeframe, TradingStyle};

pub async fn insert_analysis(
    pool: &PgPool,
    style: TradingStyle,
    timeframe: ChartTimeframe,
    analysis: &serde_json::Value,
) -> AppResult<AnalysisRecord> {
    let record = sqlx::query_as::<_, AnalysisRecord>(
        "INSERT INTO analysis_history (style, timeframe, analysis)
         VALUES ($1, $2, $3)
         RETURNING id, style, timeframe, analysis, created_at",
    )
    .bind(style)
    .bind(timeframe)
    .bind(analysis)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Most recent analyses of `style`, newest first.
pub async fn get_history(
    pool: &PgPool,
    style: TradingStyle,
    limit: i64,
) -> AppResult<Vec<AnalysisRecord>> {
    let records = sqlx::query_as::<_, AnalysisRecord>(
        "SELECT id, style, timeframe, analysis, created_at
           FROM analysis_history
          WHERE style = $1
          ORDER BY created_at DESC, id DESC
          LIMIT $2",
    )
    .bind(style)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
