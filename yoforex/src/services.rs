pub mod alerts;
pub mod analysis;
pub mod forum;
pub mod trades;
pub mod users;

/// Whether `err` is a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
