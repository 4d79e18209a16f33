use crate::app::AppState;
use crate::errors::ApiResult;
use crate::models::Quote;
use crate::pricing::filter_quotes;
use axum::{
    Json,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct PricesQuery {
    #[serde(default)]
    #[ts(optional)]
    pub use_mock: Option<bool>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct QuotesQuery {
    /// Comma separated, e.g. `EURUSD,GBPUSD`.
    #[ts(optional)]
    pub pairs: Option<String>,
}

pub async fn get_prices(
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> ApiResult<Vec<Quote>> {
    let quotes = state.quotes.quotes(query.use_mock.unwrap_or(false)).await;
    Ok(Json(quotes))
}

pub async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> ApiResult<Vec<Quote>> {
    let quotes = state.quotes.quotes(false).await;
    Ok(Json(filter_quotes(quotes, query.pairs.as_deref())))
}

pub async fn prices_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_prices(socket, state))
}

async fn relay_prices(mut socket: WebSocket, state: AppState) {
    let mut rx = state.price_events.subscribe();
    tracing::info!("Price subscriber connected");

    loop {
        tokio::select! {
            _ = state.shutdown_token.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(json) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Price subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!("Price subscriber disconnected");
}
