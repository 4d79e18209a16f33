//! One-time password delivery over WhatsApp via the WATI template API.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::{ensure_success, http_client};
use crate::config::WatiConfig;
use crate::errors::AppResult;

const TEMPLATE_NAME: &str = "login_otp";

#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct WatiClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl WatiClient {
    pub fn new(endpoint: &str, access_token: &str) -> AppResult<Self> {
        Ok(Self {
            client: http_client(10)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl OtpSender for WatiClient {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()> {
        let payload = json!({
            "template_name": TEMPLATE_NAME,
            "broadcast_name": format!("{}_{}", TEMPLATE_NAME, Utc::now().format("%d%m%Y%H%M%S")),
            "parameters": [{"name": "1", "value": code}],
        });

        let response = self
            .client
            .post(format!("{}/api/v1/sendTemplateMessage", self.endpoint))
            .query(&[("whatsappNumber", phone)])
            .header("Authorization", &self.access_token)
            .header("Content-Type", "application/json-patch+json")
            .header("accept", "*/*")
            .body(payload.to_string())
            .send()
            .await?;

        let response = ensure_success("WATI", response).await?;
        tracing::info!(phone = %phone, status = %response.status(), "OTP sent over WhatsApp");
        Ok(())
    }
}

/// Development fallback used when WATI is not configured.
#[derive(Debug, Clone, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()> {
        tracing::warn!(phone = %phone, otp = %code, "WATI not configured, OTP not delivered");
        Ok(())
    }
}

pub fn otp_sender(config: &WatiConfig) -> AppResult<std::sync::Arc<dyn OtpSender>> {
    match (config.endpoint.as_deref(), config.access_token.as_deref()) {
        (Some(endpoint), Some(token)) if !endpoint.is_empty() && !token.is_empty() => {
            Ok(std::sync::Arc::new(WatiClient::new(endpoint, token)?))
        }
        _ => Ok(std::sync::Arc::new(LogOtpSender)),
    }
}
