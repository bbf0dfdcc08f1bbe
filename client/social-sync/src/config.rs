/// Configuration management for the social sync client
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    pub api: ApiConfig,
    /// Feed pagination settings
    pub feed: FeedConfig,
    /// Session evidence keys
    pub session: SessionConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the remote API
    pub base_url: String,
    /// Per-request deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Feed pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Number of posts revealed per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Keys under which session evidence is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub token_key: String,
    pub identity_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_key: "auth_tkt".to_string(),
            identity_key: "user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// Default values
fn default_base_url() -> String {
    "http://localhost:6543".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    6
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api = ApiConfig {
            base_url: std::env::var("SOCIAL_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| default_base_url()),
            timeout_secs: std::env::var("SOCIAL_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout_secs),
        };

        let page_size = match std::env::var("FEED_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("FEED_PAGE_SIZE is not a number: {}", raw))?,
            Err(_) => default_page_size(),
        };
        if page_size == 0 {
            bail!("FEED_PAGE_SIZE must be at least 1");
        }

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            token_key: std::env::var("SESSION_TOKEN_KEY").unwrap_or(defaults.token_key),
            identity_key: std::env::var("SESSION_IDENTITY_KEY").unwrap_or(defaults.identity_key),
        };

        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };
        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format,
        };

        Ok(Config {
            api,
            feed: FeedConfig { page_size },
            session,
            logging,
        })
    }
}
