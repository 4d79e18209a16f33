use crate::errors::ApiResult;
use axum::Json;

pub async fn check() -> ApiResult<&'static str> {
    Ok(Json("OK"))
}
