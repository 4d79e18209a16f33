use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gemini: GeminiConfig,
    pub market: MarketConfig,
    #[serde(default)]
    pub wati: WatiConfig,
    #[serde(default)]
    pub forum: ForumConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_minutes: i64,
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl_minutes: i64,
    #[serde(default = "default_otp_attempts")]
    pub otp_max_attempts: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub twelve_data_api_key: Option<String>,
    pub twelve_data_base_url: String,
    pub coingecko_base_url: String,
    pub exchangerate_base_url: String,
    pub exchangerate_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,
    pub timeout_secs: u64,
    /// Pairs quoted by `/prices`.
    pub symbols: Vec<String>,
    /// Pairs pushed to live price subscribers.
    pub major_pairs: Vec<String>,
    pub poll_interval_secs: u64,
}

/// WhatsApp delivery for one-time passwords. Both fields unset means OTPs
/// are only logged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatiConfig {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    pub posts_per_minute: u32,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self { posts_per_minute: 5 }
    }
}

fn default_jwt_ttl() -> i64 {
    60
}

fn default_otp_ttl() -> i64 {
    10
}

fn default_otp_attempts() -> i32 {
    5
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("YOFOREX")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("market.symbols")
                    .with_list_parse_key("market.major_pairs")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_deserializes() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.auth.otp_max_attempts, 5);
        assert_eq!(config.forum.posts_per_minute, 5);
        assert_eq!(config.market.major_pairs.len(), 5);
        assert!(config.wati.endpoint.is_none());
    }
}
