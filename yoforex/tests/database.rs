//! Rules that depend on stored state. These need a Postgres server reachable
//! through `DATABASE_URL`; run them with `cargo test -- --ignored`.

mod common;

use axum::http::{Method, StatusCode};
use common::{app_with_pool, authed, post_json, send, verified_user};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_category(app: &axum::Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(
        app.clone(),
        authed(Method::POST, "/forum/categories", token, Some(json!({ "name": name }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_post(app: &axum::Router, token: &str, category_id: i64, title: &str) -> (StatusCode, Value) {
    send(
        app.clone(),
        authed(
            Method::POST,
            "/forum/posts",
            token,
            Some(json!({ "title": title, "content": "Gold is ranging.", "category_id": category_id })),
        ),
    )
    .await
}

fn signup(name: &str) -> Value {
    json!({
        "name": name,
        "email": "ann@yoforex.test",
        "phone": "+15550001",
        "password": "hunter2222",
    })
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn signup_overwrites_pending_user_until_verified(pool: PgPool) {
    let app = app_with_pool(pool.clone());

    let (status, body) = send(app.clone(), post_json("/auth/signup", signup("Ann"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "status": "otp_sent" }));

    let (status, _) = send(app.clone(), post_json("/auth/signup", signup("Annie"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM users WHERE phone = '+15550001'")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names, vec!["Annie".to_string()]);

    sqlx::query("UPDATE users SET is_verified = TRUE WHERE phone = '+15550001'")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(app, post_json("/auth/signup", signup("Ann"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already registered and verified.");
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn wrong_otps_lock_verification(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (status, _) = send(app.clone(), post_json("/auth/signup", signup("Ann"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let wrong = json!({ "phone": "+15550001", "otp": "0000" });
    for _ in 0..5 {
        let (status, body) = send(app.clone(), post_json("/auth/verify-signup-otp", wrong.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid OTP.");
    }

    let attempts: i32 = sqlx::query_scalar("SELECT otp_attempts FROM users WHERE phone = '+15550001'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(attempts, 5);

    let code: String = sqlx::query_scalar("SELECT otp_code FROM users WHERE phone = '+15550001'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let right = json!({ "phone": "+15550001", "otp": code });
    let (status, _) = send(app.clone(), post_json("/auth/verify-signup-otp", right)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A fresh code resets the counter.
    let (status, _) = send(
        app.clone(),
        post_json("/auth/login/request-otp", json!({ "phone": "+15550001" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code: String = sqlx::query_scalar("SELECT otp_code FROM users WHERE phone = '+15550001'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let (status, body) = send(
        app,
        post_json("/auth/verify-signup-otp", json!({ "phone": "+15550001", "otp": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "verified" }));
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn posting_is_rate_limited(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, token) = verified_user(&pool, "ann").await;
    let category_id = create_category(&app, &token, "Gold").await;

    for i in 0..5 {
        let (status, _) = create_post(&app, &token, category_id, &format!("Setup {i}")).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = create_post(&app, &token, category_id, "One too many").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (_, other) = verified_user(&pool, "bob").await;
    let (status, _) = create_post(&app, &other, category_id, "Bob's setup").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn likes_toggle(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, ann) = verified_user(&pool, "ann").await;
    let (_, bob) = verified_user(&pool, "bob").await;
    let category_id = create_category(&app, &ann, "Forex").await;
    let (_, post) = create_post(&app, &ann, category_id, "EUR/USD bias").await;
    let like_uri = format!("/forum/posts/{}/like", post["id"]);

    let (_, body) = send(app.clone(), authed(Method::POST, &like_uri, &ann, None)).await;
    assert_eq!(body, json!({ "liked": true, "like_count": 1 }));
    let (_, body) = send(app.clone(), authed(Method::POST, &like_uri, &bob, None)).await;
    assert_eq!(body, json!({ "liked": true, "like_count": 2 }));
    let (_, body) = send(app.clone(), authed(Method::POST, &like_uri, &ann, None)).await;
    assert_eq!(body, json!({ "liked": false, "like_count": 1 }));

    let comment_uri = format!("/forum/posts/{}/comments", post["id"]);
    let (status, comment) = send(
        app.clone(),
        authed(Method::POST, &comment_uri, &bob, Some(json!({ "content": "Agreed" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_like = format!("/forum/comments/{}/like", comment["id"]);
    let (_, body) = send(app.clone(), authed(Method::POST, &comment_like, &ann, None)).await;
    assert_eq!(body, json!({ "liked": true, "like_count": 1 }));
    let (_, body) = send(app, authed(Method::POST, &comment_like, &ann, None)).await;
    assert_eq!(body, json!({ "liked": false, "like_count": 0 }));
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn only_authors_edit_and_locked_posts_freeze(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, ann) = verified_user(&pool, "ann").await;
    let (_, bob) = verified_user(&pool, "bob").await;
    let category_id = create_category(&app, &ann, "Crypto").await;
    let (_, post) = create_post(&app, &ann, category_id, "BTC range").await;
    let post_uri = format!("/forum/posts/{}", post["id"]);

    let (status, _) = send(
        app.clone(),
        authed(Method::PUT, &post_uri, &bob, Some(json!({ "title": "Hijacked" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(app.clone(), authed(Method::DELETE, &post_uri, &bob, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, comment) = send(
        app.clone(),
        authed(
            Method::POST,
            &format!("{}/comments", post_uri),
            &bob,
            Some(json!({ "content": "Watching 60k" })),
        ),
    )
    .await;
    let comment_uri = format!("/forum/comments/{}", comment["id"]);
    let (status, _) = send(
        app.clone(),
        authed(Method::PUT, &comment_uri, &ann, Some(json!({ "content": "Edited" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    sqlx::query("UPDATE forum_posts SET is_locked = TRUE WHERE id = $1")
        .bind(post["id"].as_i64().unwrap())
        .execute(&pool)
        .await
        .unwrap();

    let (status, _) = send(
        app.clone(),
        authed(Method::PUT, &post_uri, &ann, Some(json!({ "title": "Updated" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        app.clone(),
        authed(Method::PUT, &comment_uri, &bob, Some(json!({ "content": "Edited" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        app,
        authed(
            Method::POST,
            &format!("{}/comments", post_uri),
            &bob,
            Some(json!({ "content": "Late reply" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test]
#[ignore] // Requires Postgres running
async fn trades_and_alerts_are_owner_scoped(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, ann) = verified_user(&pool, "ann").await;
    let (_, bob) = verified_user(&pool, "bob").await;

    let (status, trade) = send(
        app.clone(),
        authed(
            Method::POST,
            "/trades",
            &ann,
            Some(json!({ "pair": "EUR/USD", "side": "long", "entry_price": "1.08", "size": "1000" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let trade_uri = format!("/trades/{}", trade["id"]);

    let (status, _) = send(app.clone(), authed(Method::GET, &trade_uri, &bob, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        app.clone(),
        authed(
            Method::POST,
            &format!("{}/close", trade_uri),
            &bob,
            Some(json!({ "exit_price": "1.09" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app.clone(), authed(Method::DELETE, &trade_uri, &bob, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app.clone(), authed(Method::GET, &trade_uri, &ann, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, alert) = send(
        app.clone(),
        authed(
            Method::POST,
            "/alerts",
            &ann,
            Some(json!({ "pair": "XAU/USD", "target": "2400", "direction": "up" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let alert_uri = format!("/alerts/{}", alert["id"]);

    let (_, listed) = send(app.clone(), authed(Method::GET, "/alerts", &bob, None)).await;
    assert_eq!(listed, json!([]));
    let (status, _) = send(app.clone(), authed(Method::DELETE, &alert_uri, &bob, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app, authed(Method::DELETE, &alert_uri, &ann, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
