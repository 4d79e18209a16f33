use crate::app::AppState;
use crate::errors::{ApiResult, AppError, AppResult};
use crate::models::{User, UserProfile};
use crate::security::{AuthUser, otp, password};
use crate::services::{self, users};
use axum::{Json, extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct PhoneOtpRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct EmailLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct RequestOtpRequest {
    pub phone: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TokenResponse {
    pub status: String,
    pub access_token: String,
    pub token_type: String,
}

const PASSWORD_MIN_LEN: usize = 8;

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}

fn validate_signup(request: &SignupRequest) -> AppResult<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required.".to_string()));
    }
    if !is_valid_email(request.email.trim()) {
        return Err(AppError::BadRequest("Invalid email address.".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Phone number is required.".to_string()));
    }
    if request.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters.",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

async fn hash_blocking(plain: String) -> AppResult<String> {
    Ok(tokio::task::spawn_blocking(move || password::hash_password(&plain)).await?)
}

async fn verify_blocking(plain: String, stored: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored)).await?
}

async fn user_by_phone(state: &AppState, phone: &str) -> AppResult<User> {
    users::find_by_phone(&state.db_pool, phone.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))
}

/// Checks the submitted code, recording the attempt when it is wrong.
async fn check_otp(state: &AppState, user: &User, submitted: &str) -> AppResult<()> {
    match otp::check(user, submitted, state.auth.otp_max_attempts, Utc::now())? {
        otp::OtpCheck::Valid => Ok(()),
        otp::OtpCheck::Mismatch => {
            users::record_failed_attempt(&state.db_pool, user.id).await?;
            Err(AppError::BadRequest("Invalid OTP.".to_string()))
        }
    }
}

fn token_response(state: &AppState, user: &User) -> AppResult<TokenResponse> {
    Ok(TokenResponse {
        status: "login_successful".to_string(),
        access_token: state.jwt.issue(user.id, &user.email)?,
        token_type: "bearer".to_string(),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<StatusResponse>)> {
    validate_signup(&request)?;

    let name = request.name.trim();
    let email = request.email.trim();
    let phone = request.phone.trim();

    let existing = users::find_by_phone_or_email(&state.db_pool, phone, email).await?;
    if existing.iter().any(|u| u.is_verified) {
        return Err(AppError::BadRequest(
            "User already registered and verified.".to_string(),
        ));
    }

    let password_hash = hash_blocking(request.password.clone()).await?;
    let code = otp::generate_code();
    let new_user = users::NewUser {
        name,
        email,
        phone,
        password_hash: &password_hash,
        otp_code: &code,
        otp_expiry: Utc::now() + Duration::minutes(state.auth.otp_ttl_minutes),
    };

    let saved = match existing.first() {
        Some(pending) => users::overwrite_pending(&state.db_pool, pending.id, &new_user).await,
        None => users::insert_pending(&state.db_pool, &new_user).await,
    };

    let user = match saved {
        Ok(user) => user,
        Err(AppError::Database(e)) if services::is_unique_violation(&e) => {
            return Err(AppError::BadRequest(
                "Phone number or email already in use.".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    state.otp_sender.send_otp(&user.phone, &code).await?;
    tracing::info!(user_id = user.id, "Signup OTP issued");

    Ok((StatusCode::CREATED, Json(StatusResponse::new("otp_sent"))))
}

pub async fn verify_signup_otp(
    State(state): State<AppState>,
    Json(request): Json<PhoneOtpRequest>,
) -> ApiResult<StatusResponse> {
    let user = user_by_phone(&state, &request.phone).await?;
    if user.is_verified {
        return Ok(Json(StatusResponse::new("already_verified")));
    }

    check_otp(&state, &user, &request.otp).await?;
    users::consume_otp(&state.db_pool, user.id, true).await?;
    tracing::info!(user_id = user.id, "User verified");

    Ok(Json(StatusResponse::new("verified")))
}

pub async fn login_email(
    State(state): State<AppState>,
    Json(request): Json<EmailLoginRequest>,
) -> ApiResult<TokenResponse> {
    let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

    let user = users::find_by_email(&state.db_pool, request.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_blocking(request.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    if !user.is_verified {
        return Err(AppError::Forbidden(
            "Account not verified. Complete OTP verification first.".to_string(),
        ));
    }

    Ok(Json(token_response(&state, &user)?))
}

pub async fn request_login_otp(
    State(state): State<AppState>,
    Json(request): Json<RequestOtpRequest>,
) -> ApiResult<StatusResponse> {
    let user = user_by_phone(&state, &request.phone).await?;

    let code = otp::generate_code();
    let expiry = Utc::now() + Duration::minutes(state.auth.otp_ttl_minutes);
    users::set_otp(&state.db_pool, user.id, &code, expiry).await?;
    state.otp_sender.send_otp(&user.phone, &code).await?;

    Ok(Json(StatusResponse::new("otp_sent")))
}

pub async fn verify_login_otp(
    State(state): State<AppState>,
    Json(request): Json<PhoneOtpRequest>,
) -> ApiResult<TokenResponse> {
    let user = user_by_phone(&state, &request.phone).await?;

    check_otp(&state, &user, &request.otp).await?;
    users::consume_otp(&state.db_pool, user.id, false).await?;

    Ok(Json(token_response(&state, &user)?))
}

pub async fn logout(AuthUser(user): AuthUser) -> ApiResult<StatusResponse> {
    tracing::debug!(user_id = user.id, "User logged out");
    Ok(Json(StatusResponse::new("logged_out")))
}

pub async fn me(AuthUser(user): AuthUser) -> ApiResult<UserProfile> {
    Ok(Json(UserProfile::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, phone: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_needs_single_at_with_both_sides() {
        assert!(is_valid_email("trader@yoforex.net"));
        assert!(!is_valid_email("trader.yoforex.net"));
        assert!(!is_valid_email("@yoforex.net"));
        assert!(!is_valid_email("trader@"));
        assert!(!is_valid_email("a@b@c"));
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup(&request("Ann", "ann@x.io", "+15550001", "hunter22")).is_ok());
        assert!(validate_signup(&request(" ", "ann@x.io", "+15550001", "hunter22")).is_err());
        assert!(validate_signup(&request("Ann", "ann", "+15550001", "hunter22")).is_err());
        assert!(validate_signup(&request("Ann", "ann@x.io", "", "hunter22")).is_err());
        assert!(matches!(
            validate_signup(&request("Ann", "ann@x.io", "+15550001", "short")),
            Err(AppError::BadRequest(_))
        ));
    }
}
