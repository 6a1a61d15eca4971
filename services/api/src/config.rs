//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_COMPANY_INFO: &str = "We help businesses reach their customers on WhatsApp \
with personalised campaigns and fast, friendly answers to common questions.";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,

    // LLM
    pub openrouter_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,

    // Messaging platform sidecar
    pub wppconnect_url: String,
    pub wppconnect_secret: String,
    pub webhook_url: String,
    /// Shared secret the sidecar echoes back as `?token=` on every webhook call.
    pub webhook_token: String,

    // Session lifecycle
    pub session_name: String,
    pub tokens_dir: PathBuf,
    pub reconnect_interval: Duration,
    pub pairing_timeout: Duration,
    pub pairing_max_attempts: u32,
    pub pairing_retry_delay: Duration,

    // Outreach
    pub send_delay: Duration,
    pub sent_ledger_path: PathBuf,
    pub media_attachment_path: Option<PathBuf>,
    pub company_info: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:5000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load LLM Settings (the key is optional) ---
        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let llm_base_url = var_or("LLM_BASE_URL", "https://openrouter.ai/api/v1");
        let llm_model = var_or("LLM_MODEL", "anthropic/claude-3-haiku");

        // --- Load Platform Sidecar Settings ---
        let wppconnect_url = var_or("WPPCONNECT_URL", "http://localhost:21465");
        let wppconnect_secret = var_or("WPPCONNECT_SECRET", "THISISMYSECURETOKEN");
        let webhook_url = var_or(
            "WEBHOOK_URL",
            "http://localhost:5000/webhooks/wppconnect",
        );
        let webhook_token = std::env::var("WEBHOOK_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .unwrap_or_else(|| wppconnect_secret.clone());

        // --- Load Session Settings ---
        let session_name = var_or("SESSION_NAME", "whatsapp-session-new");
        let tokens_dir = PathBuf::from(var_or("TOKENS_DIR", "./tokens"));
        let reconnect_interval =
            Duration::from_secs(parse_var("RECONNECT_INTERVAL_SECS", "30")?);
        let pairing_timeout = Duration::from_secs(parse_var("PAIRING_TIMEOUT_SECS", "900")?);
        let pairing_max_attempts: u32 = parse_var("PAIRING_MAX_ATTEMPTS", "5")?;
        let pairing_retry_delay =
            Duration::from_secs(parse_var("PAIRING_RETRY_DELAY_SECS", "10")?);

        // --- Load Outreach Settings ---
        let send_delay = Duration::from_millis(parse_var("SEND_DELAY_MS", "4000")?);
        let sent_ledger_path = PathBuf::from(var_or("SENT_LEDGER_PATH", "./sent_campaigns.json"));
        let media_attachment_path = std::env::var("MEDIA_ATTACHMENT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let company_info = var_or("COMPANY_INFO", DEFAULT_COMPANY_INFO);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openrouter_api_key,
            llm_base_url,
            llm_model,
            wppconnect_url,
            wppconnect_secret,
            webhook_url,
            webhook_token,
            session_name,
            tokens_dir,
            reconnect_interval,
            pairing_timeout,
            pairing_max_attempts,
            pairing_retry_delay,
            send_delay,
            sent_ledger_path,
            media_attachment_path,
            company_info,
        })
    }

    /// The on-disk credential directory of the configured session.
    pub fn session_dir(&self) -> PathBuf {
        self.tokens_dir.join(&self.session_name)
    }

    /// The webhook URL handed to the sidecar, carrying `webhook_token`.
    pub fn sidecar_webhook_url(&self) -> String {
        match reqwest::Url::parse(&self.webhook_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("token", &self.webhook_token);
                url.into()
            }
            Err(_) => format!("{}?token={}", self.webhook_url, self.webhook_token),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
