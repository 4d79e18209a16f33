use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppResult;
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, is_verified, otp_code, \
     otp_expiry, otp_attempts, created_at";

/// Fields written when a user signs up or re-signs up before verifying.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub otp_code: &'a str,
    pub otp_expiry: DateTime<Utc>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower($1)",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_phone(pool: &PgPool, phone: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE phone = $1", USER_COLUMNS))
        .bind(phone)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Users owning either the phone or the email, verified ones first.
pub async fn find_by_phone_or_email(pool: &PgPool, phone: &str, email: &str) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE phone = $1 OR lower(email) = lower($2) \
         ORDER BY is_verified DESC, id ASC",
        USER_COLUMNS
    ))
    .bind(phone)
    .bind(email)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn insert_pending(pool: &PgPool, user: &NewUser<'_>) -> AppResult<User> {
    let created = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, phone, password_hash, is_verified, otp_code, otp_expiry, otp_attempts) \
         VALUES ($1, $2, $3, $4, FALSE, $5, $6, 0) \
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user.name)
    .bind(user.email)
    .bind(user.phone)
    .bind(user.password_hash)
    .bind(user.otp_code)
    .bind(user.otp_expiry)
    .fetch_one(pool)
    .await?;
    Ok(created)
}

/// Replaces the details of an unverified user.
pub async fn overwrite_pending(pool: &PgPool, id: i64, user: &NewUser<'_>) -> AppResult<User> {
    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $2, email = $3, phone = $4, password_hash = $5, \
         otp_code = $6, otp_expiry = $7, otp_attempts = 0 \
         WHERE id = $1 AND is_verified = FALSE \
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.phone)
    .bind(user.password_hash)
    .bind(user.otp_code)
    .bind(user.otp_expiry)
    .fetch_one(pool)
    .await?;
    Ok(updated)
}

pub async fn set_otp(pool: &PgPool, id: i64, code: &str, expiry: DateTime<Utc>) -> AppResult<()> {
    sqlx::query("UPDATE users SET otp_code = $2, otp_expiry = $3, otp_attempts = 0 WHERE id = $1")
        .bind(id)
        .bind(code)
        .bind(expiry)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_failed_attempt(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE users SET otp_attempts = otp_attempts + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Clears the pending code, optionally marking the user verified.
pub async fn consume_otp(pool: &PgPool, id: i64, verify: bool) -> AppResult<()> {
    sqlx::query(
        "UPDATE users SET otp_code = NULL, otp_expiry = NULL, otp_attempts = 0, \
         is_verified = is_verified OR $2 WHERE id = $1",
    )
    .bind(id)
    .bind(verify)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count(pool: &PgPool) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(total)
}
