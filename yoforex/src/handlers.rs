pub mod alerts;
pub mod analysis;
pub mod auth;
pub mod forum;
pub mod info;
pub mod market;
pub mod news;
pub mod tools;
pub mod trades;

use crate::errors::{AppError, AppResult};

/// Checks a 1-based page number and returns how many rows precede it.
pub(crate) fn page_offset(page: i64, per_page: i64) -> AppResult<i64> {
    if page < 1 {
        return Err(AppError::BadRequest("Page must be at least 1.".to_string()));
    }
    page.checked_mul(per_page)
        .map(|end| end - per_page)
        .ok_or_else(|| AppError::BadRequest("Page is out of range.".to_string()))
}
