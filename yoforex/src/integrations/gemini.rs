//! Chart analysis through the Gemini `generateContent` endpoint.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::http_client;
use crate::config::GeminiConfig;
use crate::errors::{AppError, AppResult};
use crate::models::ChartTimeframe;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Instructions sent alongside the chart. The model first checks that the
/// screenshot's timeframe matches, then fills the recommendation schema.
pub fn chart_prompt(timeframe: ChartTimeframe) -> String {
    format!(
        concat!(
            "You are an expert trading chart analyst using ICT concepts. ",
            "First, verify that the timeframe displayed on the chart screenshot matches the selected timeframe ({tf}). ",
            "If it does NOT match, respond ONLY with this JSON:\n",
            "{{ \"error\":\"Provided timeframe does not match chart timeframe.\" }}\n",
            "Otherwise, based on the selected timeframe, respond ONLY with this JSON schema:\n",
            "{{",
            "\"signal\":\"BUY or SELL\", ",
            "\"confidence\":\"int %\", ",
            "\"entry\":\"price\", ",
            "\"stop_loss\":\"price\", ",
            "\"take_profit\":\"price\", ",
            "\"risk_reward_ratio\":\"R:R\", ",
            "\"timeframe\":\"{tf}\", ",
            "\"technical_analysis\":{{",
            "\"RSI\":\"num\",",
            "\"MACD\":\"Bullish/Bearish\",",
            "\"Moving_Average\":\"status\",",
            "\"ICT_Order_Block\":\"Detected/Not Detected\",",
            "\"ICT_Fair_Value_Gap\":\"Detected/Not Detected\",",
            "\"ICT_Breaker_Block\":\"Detected/Not Detected\",",
            "\"ICT_Trendline\":\"Upward/Downward/Neutral\"",
            "}}, ",
            "\"recommendation\":\"text\", ",
            "\"dynamic_stop_loss\":\"calculated based on selected timeframe\", ",
            "\"dynamic_take_profit\":\"calculated based on selected timeframe\" ",
            "}}"
        ),
        tf = timeframe
    )
}

/// Models occasionally wrap JSON output in a Markdown code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> AppResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Sends the chart image with the analysis prompt and returns the
    /// model's JSON answer untouched.
    pub async fn analyze_chart(
        &self,
        image: &[u8],
        mime_type: &str,
        timeframe: ChartTimeframe,
    ) -> AppResult<serde_json::Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AppError::Upstream(
                "AI API error: Gemini API key is not configured".to_string(),
            ));
        };

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: chart_prompt(timeframe),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!(model = %self.model, %timeframe, bytes = image.len(), "Requesting chart analysis");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream(format!("AI API error: {}", body)));
        }

        let generated: GenerateResponse = response.json().await?;
        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AppError::Upstream("AI API error: empty response".to_string()))?;

        serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            AppError::Upstream(format!("AI API error: response is not valid JSON: {}", e))
        })
    }
}
