use sqlx::postgres::PgPoolOptions;
use std::{
    net::{Ipv4Addr, SocketAddrV4},
    str::FromStr,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yoforex::tasks::{AlertMonitor, LimiterSweep, PriceTicker};
use yoforex::{AppState, Config, create_app};

#[tokio::main]
async fn main() {
    let config = Config::load().expect("Failed to load config");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!("Loaded configuration");

    tracing::info!("Connecting to database");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    let token = CancellationToken::new();
    let state = AppState::new(&config, db_pool.clone(), token.clone())
        .expect("Failed to initialize application state");

    let monitor = AlertMonitor::new(
        db_pool,
        state.price_feed.clone(),
        state.alert_events.clone(),
        state.poll_interval,
    );
    let ticker = PriceTicker::new(
        state.price_feed.clone(),
        state.major_pairs.clone(),
        state.price_events.clone(),
        state.poll_interval,
    );
    let sweep = LimiterSweep::new(state.post_limiter.clone(), Duration::from_secs(60));
    let monitor_handle = tokio::spawn(monitor.run(token.clone()));
    let ticker_handle = tokio::spawn(ticker.run(token.clone()));
    let sweep_handle = tokio::spawn(sweep.run(token.clone()));

    let app = create_app(state);

    let host = Ipv4Addr::from_str(&config.server.host).expect("Invalid server host IP");
    let addr = SocketAddrV4::new(host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!("Server listening on {}", addr);

    async fn shutdown_signal(token: CancellationToken) {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c signal");
        tracing::info!("Ctrl+C received, shutting down...");
        token.cancel();
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(token.clone()))
        .await
        .expect("Server error");

    let _ = tokio::join!(monitor_handle, ticker_handle, sweep_handle);
}
