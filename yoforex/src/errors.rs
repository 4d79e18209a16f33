use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Upstream Error: {0}")]
    Upstream(String),

    #[error("Io Error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::IO(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, message) = match &self {
            AppError::NotFound(msg) => {
                tracing::warn!(
                    error_type = %"NotFound",
                    status_code = %status,
                    message = %msg,
                    "Resource not found"
                );
                ("NotFound", msg.clone())
            }
            AppError::BadRequest(msg) => {
                tracing::warn!(
                    error_type = %"BadRequest",
                    status_code = %status,
                    message = %msg,
                    "Bad Request"
                );
                ("BadRequest", msg.clone())
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!(
                    error_type = %"Unauthorized",
                    status_code = %status,
                    message = %msg,
                    "Unauthorized"
                );
                ("Unauthorized", msg.clone())
            }
            AppError::Forbidden(msg) => {
                tracing::warn!(
                    error_type = %"Forbidden",
                    status_code = %status,
                    message = %msg,
                    "Forbidden"
                );
                ("Forbidden", msg.clone())
            }
            AppError::TooManyRequests(msg) => {
                tracing::warn!(
                    error_type = %"TooManyRequests",
                    status_code = %status,
                    message = %msg,
                    "Request throttled"
                );
                ("TooManyRequests", msg.clone())
            }
            AppError::Upstream(msg) => {
                tracing::error!(
                    error_type = %"Upstream",
                    status_code = %status,
                    message = %msg,
                    "Upstream service failed"
                );
                ("Upstream", msg.clone())
            }
            AppError::IO(err) => {
                let msg = err.to_string();
                tracing::error!(
                    error_type = %"IO",
                    status_code = %status,
                    message = %msg,
                    "IO operation failed"
                );
                ("IO", msg)
            }
            AppError::Database(err) => {
                let msg = err.to_string();
                tracing::error!(
                    error_type = %"Database",
                    status_code = %status,
                    message = %msg,
                    "Database operation failed"
                );
                ("Database", msg)
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    error_type = %"Internal",
                    status_code = %status,
                    message = %msg,
                    "Internal server error"
                );
                ("Internal", msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });
        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parse error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid upload: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
pub type ApiResult<T> = std::result::Result<Json<T>, AppError>;
