pub mod app;
pub mod chart;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod integrations;
pub mod models;
pub mod performance;
pub mod pricing;
pub mod security;
pub mod services;
pub mod tasks;

pub use crate::app::{AppState, create_app};
pub use crate::config::Config;
pub use crate::errors::{AppError, AppResult};
