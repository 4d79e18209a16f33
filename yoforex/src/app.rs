use crate::config::{AuthConfig, Config};
use crate::errors::{AppError, AppResult};
use crate::handlers;
use crate::integrations::finnhub::FinnhubClient;
use crate::integrations::gemini::GeminiClient;
use crate::integrations::wati::{OtpSender, otp_sender};
use crate::models::{AlertEvent, Pair, PriceEvent};
use crate::pricing::{LivePriceFeed, PriceFeed, QuoteBoard};
use crate::security::JwtKeys;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post, put},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use sqlx::PgPool;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Chart uploads may be larger than axum's default body limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt: JwtKeys,
    pub auth: AuthConfig,
    pub otp_sender: Arc<dyn OtpSender>,
    pub gemini: GeminiClient,
    pub quotes: QuoteBoard,
    pub price_feed: Arc<dyn PriceFeed>,
    pub major_pairs: Vec<Pair>,
    pub poll_interval: Duration,
    pub finnhub: FinnhubClient,
    pub alert_events: broadcast::Sender<AlertEvent>,
    pub price_events: broadcast::Sender<PriceEvent>,
    pub post_limiter: Arc<DefaultKeyedRateLimiter<i64>>,
    pub cors_origins: Vec<String>,
    pub shutdown_token: CancellationToken,
}

impl AppState {
    pub fn new(config: &Config, db_pool: PgPool, shutdown_token: CancellationToken) -> AppResult<Self> {
        let major_pairs = config
            .market
            .major_pairs
            .iter()
            .map(|p| p.parse())
            .collect::<AppResult<Vec<Pair>>>()?;

        let posts_per_minute = NonZeroU32::new(config.forum.posts_per_minute)
            .ok_or_else(|| AppError::Internal("forum.posts_per_minute must be positive".into()))?;

        let (alert_events, _) = broadcast::channel(1000);
        let (price_events, _) = broadcast::channel(16);

        Ok(Self {
            db_pool,
            jwt: JwtKeys::new(&config.auth.jwt_secret, config.auth.jwt_ttl_minutes),
            auth: config.auth.clone(),
            otp_sender: otp_sender(&config.wati)?,
            gemini: GeminiClient::new(&config.gemini)?,
            quotes: QuoteBoard::new(&config.market)?,
            price_feed: Arc::new(LivePriceFeed::new(&config.market)?),
            major_pairs,
            poll_interval: Duration::from_secs(config.market.poll_interval_secs.max(1)),
            finnhub: FinnhubClient::new(
                &config.market.finnhub_base_url,
                config.market.finnhub_api_key.clone(),
                config.market.timeout_secs,
            )?,
            alert_events,
            price_events,
            post_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(posts_per_minute))),
            cors_origins: config.server.cors_origins.clone(),
            shutdown_token,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);
    let upload_limit = DefaultBodyLimit::max(MAX_UPLOAD_BYTES);

    Router::new()
        .route("/health", get(handlers::info::check))
        // auth
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/verify-signup-otp", post(handlers::auth::verify_signup_otp))
        .route("/auth/login/email", post(handlers::auth::login_email))
        .route("/auth/login/request-otp", post(handlers::auth::request_login_otp))
        .route("/auth/login/verify-otp", post(handlers::auth::verify_login_otp))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        // chart analysis
        .route(
            "/scalp/chart",
            post(handlers::analysis::scalp_chart).layer(upload_limit.clone()),
        )
        .route("/scalp/history", get(handlers::analysis::scalp_history))
        .route(
            "/swing/chart",
            post(handlers::analysis::swing_chart).layer(upload_limit),
        )
        .route("/swing/history", get(handlers::analysis::swing_history))
        // market data
        .route("/prices", get(handlers::market::get_prices))
        .route("/prices/ws", get(handlers::market::prices_ws))
        .route("/market/quotes", get(handlers::market::get_quotes))
        .route("/news", get(handlers::news::get_news))
        .route("/news/company/{symbol}", get(handlers::news::get_company_news))
        // alerts
        .route(
            "/alerts",
            get(handlers::alerts::list_alerts).post(handlers::alerts::create_alert),
        )
        .route("/alerts/stream", get(handlers::alerts::stream_alerts))
        .route(
            "/alerts/{id}",
            axum::routing::delete(handlers::alerts::delete_alert),
        )
        // forum
        .route(
            "/forum/categories",
            get(handlers::forum::list_categories).post(handlers::forum::create_category),
        )
        .route("/forum/categories/{id}", put(handlers::forum::update_category))
        .route(
            "/forum/posts",
            get(handlers::forum::list_posts).post(handlers::forum::create_post),
        )
        .route(
            "/forum/posts/{id}",
            get(handlers::forum::get_post)
                .put(handlers::forum::update_post)
                .delete(handlers::forum::delete_post),
        )
        .route("/forum/posts/{id}/comments", post(handlers::forum::create_comment))
        .route("/forum/posts/{id}/like", post(handlers::forum::like_post))
        .route(
            "/forum/comments/{id}",
            put(handlers::forum::update_comment).delete(handlers::forum::delete_comment),
        )
        .route("/forum/comments/{id}/like", post(handlers::forum::like_comment))
        .route("/forum/stats", get(handlers::forum::get_stats))
        // trade journal
        .route(
            "/trades",
            get(handlers::trades::list_trades).post(handlers::trades::create_trade),
        )
        .route(
            "/trades/{id}",
            get(handlers::trades::get_trade).delete(handlers::trades::delete_trade),
        )
        .route("/trades/{id}/close", post(handlers::trades::close_trade))
        .route("/performance", get(handlers::trades::get_performance))
        // tools
        .route("/tools/pretrade/calc", post(handlers::tools::pretrade_calc))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
