use crate::app::AppState;
use crate::chart;
use crate::errors::{ApiResult, AppError, AppResult};
use crate::models::{AnalysisRecord, ChartTimeframe, TradingStyle};
use crate::services::analysis;
use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use serde::Deserialize;
use ts_rs::TS;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct ChartQuery {
    pub timeframe: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct HistoryQuery {
    #[ts(optional, type = "number")]
    pub limit: Option<i64>,
}

fn parse_timeframe(style: TradingStyle, raw: &str) -> AppResult<ChartTimeframe> {
    let invalid = || {
        let allowed: Vec<String> = style.timeframes().iter().map(|tf| tf.to_string()).collect();
        AppError::BadRequest(format!(
            "Invalid timeframe '{}' for {} analysis. Allowed: {}",
            raw,
            style,
            allowed.join(", ")
        ))
    };

    let timeframe: ChartTimeframe = raw.trim().to_ascii_uppercase().parse().map_err(|_| invalid())?;
    if !style.accepts(timeframe) {
        return Err(invalid());
    }
    Ok(timeframe)
}

async fn read_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                break;
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::BadRequest("No chart image uploaded.".to_string()))
}

/// The model answers `{"error": "..."}` when the chart does not match the
/// requested timeframe.
fn model_rejection(analysis: &serde_json::Value) -> Option<String> {
    analysis
        .get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}

async fn analyze(
    state: AppState,
    style: TradingStyle,
    timeframe: &str,
    multipart: Multipart,
) -> ApiResult<serde_json::Value> {
    let timeframe = parse_timeframe(style, timeframe)?;
    let image = read_upload(multipart).await?;

    let (image, is_chart) = tokio::task::spawn_blocking(move || {
        let is_chart = chart::is_trading_chart(&image);
        (image, is_chart)
    })
    .await?;

    if !is_chart {
        return Err(AppError::BadRequest(
            "Please upload a valid trading chart image.".to_string(),
        ));
    }

    let result = state
        .gemini
        .analyze_chart(&image, chart::mime_type(&image), timeframe)
        .await?;

    if let Some(message) = model_rejection(&result) {
        return Err(AppError::BadRequest(message));
    }

    let record = analysis::insert_analysis(&state.db_pool, style, timeframe, &result).await?;
    tracing::info!(id = record.id, %style, %timeframe, "Chart analysis stored");

    Ok(Json(result))
}

async fn history(state: AppState, style: TradingStyle, query: HistoryQuery) -> ApiResult<Vec<AnalysisRecord>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let records = analysis::get_history(&state.db_pool, style, limit).await?;
    Ok(Json(records))
}

pub async fn scalp_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
    multipart: Multipart,
) -> ApiResult<serde_json::Value> {
    analyze(state, TradingStyle::Scalp, &query.timeframe, multipart).await
}

pub async fn swing_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
    multipart: Multipart,
) -> ApiResult<serde_json::Value> {
    analyze(state, TradingStyle::Swing, &query.timeframe, multipart).await
}

pub async fn scalp_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<AnalysisRecord>> {
    history(state, TradingStyle::Scalp, query).await
}

pub async fn swing_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<AnalysisRecord>> {
    history(state, TradingStyle::Swing, query).await
}
