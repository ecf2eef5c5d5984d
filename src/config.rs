use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_FEED_URL: &str = "https://coinn.pl/feed/";
const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
pub const DEFAULT_WEBHOOK_SECRET: &str = "secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: String,
    pub feed_url: String,
    pub poll_interval: Duration,
    pub send_delay: Duration,
    pub webhook_secret: String,
    pub port: u16,
    pub seen_file: PathBuf,
    pub telegram_api_base: String,
    pub sentry_dsn: Option<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let chat_id = get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;

        let poll_secs = parse_number("POLL_INTERVAL_SECONDS", get("POLL_INTERVAL_SECONDS"), 60)?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
                reason: "must be greater than zero",
            });
        }
        let send_delay_ms = parse_number("SEND_DELAY_MS", get("SEND_DELAY_MS"), 1000)?;
        let port = parse_number("PORT", get("PORT"), 3000u16)?;

        Ok(Self {
            bot_token,
            chat_id,
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            poll_interval: Duration::from_secs(poll_secs),
            send_delay: Duration::from_millis(send_delay_ms),
            webhook_secret: get("WEBHOOK_SECRET").unwrap_or_else(|| DEFAULT_WEBHOOK_SECRET.to_string()),
            port,
            seen_file: get("SEEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("seen.json")),
            telegram_api_base: get("TELEGRAM_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string()),
            sentry_dsn: get("SENTRY_DSN"),
            environment: get("ENVIRONMENT").unwrap_or_else(|| "local".to_string()),
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.webhook_secret == DEFAULT_WEBHOOK_SECRET
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            reason: "expected a non-negative integer",
        }),
    }
}
