use crate::app::AppState;
use crate::errors::{ApiResult, AppError, AppResult};
use crate::models::{AlertDirection, Pair, PriceAlert};
use crate::security::AuthUser;
use crate::services::alerts;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use bigdecimal::{BigDecimal, Zero};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateAlertRequest {
    pub pair: String,
    #[ts(type = "number | string")]
    pub target: BigDecimal,
    pub direction: AlertDirection,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<PriceAlert>> {
    let alerts = alerts::list_for_user(&state.db_pool, user.id).await?;
    Ok(Json(alerts))
}

pub async fn create_alert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateAlertRequest>,
) -> AppResult<(StatusCode, Json<PriceAlert>)> {
    let pair: Pair = request.pair.parse()?;
    if request.target <= BigDecimal::zero() {
        return Err(AppError::BadRequest(
            "Alert target must be positive.".to_string(),
        ));
    }

    let alert = alerts::create(
        &state.db_pool,
        user.id,
        &pair.to_string(),
        &request.target,
        request.direction,
    )
    .await?;
    tracing::info!(alert_id = alert.id, user_id = user.id, pair = %pair, "Price alert created");

    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !alerts::delete(&state.db_pool, id, user.id).await? {
        return Err(AppError::NotFound(format!("Alert with id '{}' not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Relays the caller's own alert events until shutdown.
pub async fn stream_alerts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.alert_events.subscribe();
    let user_id = user.id;

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = state.shutdown_token.cancelled() => {
                    break;
                }
                result = rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(user_id, skipped, "Alert subscriber lagged");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if event.user_id() != user_id {
                        continue;
                    }

                    let Ok(data) = serde_json::to_string(&event) else {
                        continue;
                    };

                    yield Ok(Event::default().data(data));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
