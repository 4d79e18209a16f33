use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::app::AppState;
use crate::errors::AppError;
use crate::models::User;
use crate::services;

/// The user behind a valid bearer token.
///
/// The token is read from the `Authorization` header, or from a `token`
/// query parameter for clients such as `EventSource` that cannot set
/// headers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn credentials_error() -> AppError {
    AppError::Unauthorized("Could not validate credentials".to_string())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(|token| token.trim().to_string());

    from_header.or_else(|| {
        parts.uri.query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "token")
                .map(|(_, value)| value.to_string())
        })
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(credentials_error)?;
        let claims = state.jwt.verify(&token)?;

        let user = services::users::find_by_id(&state.db_pool, claims.user_id()?)
            .await?
            .ok_or_else(credentials_error)?;

        Ok(AuthUser(user))
    }
}
