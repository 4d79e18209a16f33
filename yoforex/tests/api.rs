mod common;

use axum::http::{StatusCode, header};
use common::{get, post_json, post_upload, send, test_app, test_config};
use serde_json::json;
use yoforex::security::JwtKeys;

#[tokio::test]
async fn health_check() {
    let app = test_app(&test_config("http://127.0.0.1:9"));
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = test_app(&test_config("http://127.0.0.1:9"));

    let response = tower::ServiceExt::oneshot(app.clone(), get("/alerts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, body) = send(app.clone(), get("/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Could not validate credentials");

    let forged = JwtKeys::new("another-secret", 60).issue(1, "a@b.c").unwrap();
    let request = axum::http::Request::builder()
        .uri("/trades")
        .header(header::AUTHORIZATION, format!("Bearer {}", forged))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pretrade_calculator() {
    let app = test_app(&test_config("http://127.0.0.1:9"));

    let (status, body) = send(
        app.clone(),
        post_json(
            "/tools/pretrade/calc",
            json!({"entry": 100.0, "stop": 98.0, "risk_pct": 1.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_amount"], 100.0);
    assert_eq!(body["position_size"], 50.0);

    let (status, body) = send(
        app,
        post_json(
            "/tools/pretrade/calc",
            json!({"entry": 1.1, "stop": 1.1, "risk_pct": 1.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn prices_fall_back_to_mock_data() {
    let app = test_app(&test_config("http://127.0.0.1:9"));

    let (status, body) = send(app.clone(), get("/prices?use_mock=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
    assert_eq!(body[0]["pair"], "EUR/USD");

    // No API key configured.
    let (status, body) = send(app.clone(), get("/prices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);

    let (status, body) = send(app, get("/market/quotes?pairs=usdjpy,EURUSD")).await;
    assert_eq!(status, StatusCode::OK);
    let pairs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["pair"].as_str().unwrap())
        .collect();
    assert_eq!(pairs, vec!["EUR/USD", "USD/JPY"]);
}

#[tokio::test]
async fn live_prices_report_change_between_fetches() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/price")
        .match_query(mockito::Matcher::UrlEncoded(
            "symbol".into(),
            "EUR/USD,GBP/USD".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"EUR/USD":{"price":"1.1000"},"GBP/USD":{"price":"1.2500"}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.market.twelve_data_api_key = Some("td-key".to_string());
    let app = test_app(&config);

    let (status, body) = send(app.clone(), get("/prices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["price"], 1.1);
    assert_eq!(body[0]["change"], 0.0);
    first.assert_async().await;
    first.remove_async().await;

    server
        .mock("GET", "/price")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"EUR/USD":{"price":"1.1110"},"GBP/USD":{"price":"1.2500"}}"#)
        .create_async()
        .await;

    let (_, body) = send(app, get("/prices")).await;
    assert_eq!(body[0]["change"], 1.0);
    assert_eq!(body[1]["change"], 0.0);
}

#[tokio::test]
async fn chart_upload_is_screened() {
    let app = test_app(&test_config("http://127.0.0.1:9"));

    let (status, body) = send(app.clone(), post_upload("/scalp/chart?timeframe=D1", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid timeframe"));

    let (status, body) = send(
        app,
        post_upload("/swing/chart?timeframe=H1", b"definitely not an image"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please upload a valid trading chart image.");
}

#[tokio::test]
async fn news_digest_from_finnhub() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/news")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("category".into(), "general".into()),
            mockito::Matcher::UrlEncoded("token".into(), "fh-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"headline": "Gold hits record high", "summary": "Bullion rallies.", "url": "https://n/1", "datetime": 1700000000, "source": "Reuters"},
                {"headline": "Fed signals rate pause", "summary": "", "url": "https://n/2", "datetime": 1700000600, "source": "Bloomberg"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.market.finnhub_api_key = Some("fh-key".to_string());
    let app = test_app(&config);

    let (status, body) = send(app, get("/news")).await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["daily_insight"]["message"], "Gold hits record high");
    assert_eq!(body["top_news"].as_array().unwrap().len(), 2);
    assert_eq!(body["top_news"][0]["sentiment"], "positive");
    assert_eq!(body["market_events"][1]["impact"], "high");
    assert_eq!(body["risk_reminder"]["symbol"], "SPY");
}

#[tokio::test]
async fn empty_news_feed_is_an_upstream_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/news")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.market.finnhub_api_key = Some("fh-key".to_string());

    let (status, body) = send(test_app(&config), get("/news")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Upstream");
}
