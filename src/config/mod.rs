//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `ROOMNEST_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub community: CommunityConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin of the web frontend
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration (SQLite file path or `:memory:`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/roomnest.db".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a login session in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Community board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Number of reports after which a post or comment is hidden
    #[serde(default = "default_report_hide_threshold")]
    pub report_hide_threshold: i64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            report_hide_threshold: default_report_hide_threshold(),
        }
    }
}

fn default_report_hide_threshold() -> i64 {
    5
}

/// Chat-completion provider used by the room comparison feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API key; the comparison endpoint answers 503 while this is unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u64,
    /// JSON listing file used as market reference in prompts
    #[serde(default = "default_market_data_path")]
    pub market_data_path: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            max_tokens: default_ai_max_tokens(),
            temperature: default_ai_temperature(),
            timeout_seconds: default_ai_timeout(),
            market_data_path: default_market_data_path(),
        }
    }
}

impl AiConfig {
    /// The configured key, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_ai_max_tokens() -> u32 {
    1000
}

fn default_ai_temperature() -> f32 {
    0.7
}

fn default_ai_timeout() -> u64 {
    60
}

fn default_market_data_path() -> PathBuf {
    PathBuf::from("real-estate.json")
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    /// Invalid YAML is reported with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - ROOMNEST_SERVER_HOST, ROOMNEST_SERVER_PORT, ROOMNEST_SERVER_CORS_ORIGIN
    /// - ROOMNEST_DATABASE_URL
    /// - ROOMNEST_AUTH_SESSION_DAYS
    /// - ROOMNEST_COMMUNITY_REPORT_HIDE_THRESHOLD
    /// - ROOMNEST_AI_API_KEY (falls back to OPENAI_API_KEY), ROOMNEST_AI_BASE_URL,
    ///   ROOMNEST_AI_MODEL, ROOMNEST_AI_MARKET_DATA_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ROOMNEST_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ROOMNEST_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("ROOMNEST_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("ROOMNEST_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(days) = std::env::var("ROOMNEST_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                if days > 0 {
                    self.auth.session_days = days;
                }
            }
        }

        if let Ok(threshold) = std::env::var("ROOMNEST_COMMUNITY_REPORT_HIDE_THRESHOLD") {
            if let Ok(threshold) = threshold.parse::<i64>() {
                if threshold > 0 {
                    self.community.report_hide_threshold = threshold;
                }
            }
        }

        if let Ok(key) = std::env::var("ROOMNEST_AI_API_KEY") {
            self.ai.api_key = Some(key);
        } else if self.ai.api_key().is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.ai.api_key = Some(key);
            }
        }
        if let Ok(base_url) = std::env::var("ROOMNEST_AI_BASE_URL") {
            self.ai.base_url = base_url;
        }
        if let Ok(model) = std::env::var("ROOMNEST_AI_MODEL") {
            self.ai.model = model;
        }
        if let Ok(path) = std::env::var("ROOMNEST_AI_MARKET_DATA_PATH") {
            self.ai.market_data_path = PathBuf::from(path);
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn config_yaml_roundtrip(
            port in 1u16..=65535,
            days in 1i64..365,
            threshold in 1i64..50,
            host in "[a-z][a-z0-9]{0,10}",
        ) {
            let mut config = Config::default();
            config.server.port = port;
            config.server.host = host.clone();
            config.auth.session_days = days;
            config.community.report_hide_threshold = threshold;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.server.host, host);
            prop_assert_eq!(parsed.auth.session_days, days);
            prop_assert_eq!(parsed.community.report_hide_threshold, threshold);
        }
    }
}
