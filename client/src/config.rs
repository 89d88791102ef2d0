//! Client configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Numeric knobs fall back to their defaults when a variable is missing or
//! unparsable. Values that change meaning (URLs, auth mode) are validated
//! and reported as [`ConfigError`] instead.

use std::time::Duration;

use frames::{AuthConfig, AuthMode};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_AGENT_ID: &str = "conductor";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const CHAT_PATH: &str = "/ws/chat";

const DEFAULT_RECONNECT_BASE_MS: u64 = 1000;
const DEFAULT_RECONNECT_MAX_MS: u64 = 16_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid value for {key}: {value}")]
    Parse { key: &'static str, value: String },
}

/// Backoff bounds for the socket client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry after an involuntary close.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RECONNECT_MAX_MS),
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            base_delay: Duration::from_millis(env_parse(
                "HIVEMIND_RECONNECT_BASE_MS",
                DEFAULT_RECONNECT_BASE_MS,
            )),
            max_delay: Duration::from_millis(env_parse(
                "HIVEMIND_RECONNECT_MAX_MS",
                DEFAULT_RECONNECT_MAX_MS,
            )),
        }
    }

    /// `min(base_delay * 2^retry_count, max_delay)`, saturating on overflow.
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 2_u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Everything a studio session needs to reach the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudioConfig {
    /// HTTP origin of the backend, without a trailing slash.
    pub base_url: String,
    /// Socket endpoint for chat traffic.
    pub chat_url: String,
    /// Agent addressed until the user or the backend switches.
    pub agent_id: String,
    pub auth: AuthConfig,
    pub reconnect: ReconnectConfig,
}

impl StudioConfig {
    /// Build a config for `base_url` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless `base_url` is http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let chat_url = ws_endpoint(&base_url, CHAT_PATH)?;
        Ok(Self {
            base_url,
            chat_url,
            agent_id: DEFAULT_AGENT_ID.to_owned(),
            auth: AuthConfig {
                region: DEFAULT_REGION.to_owned(),
                ..AuthConfig::default()
            },
            reconnect: ReconnectConfig::default(),
        })
    }

    /// Load from `HIVEMIND_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-http(s) base URL or an unknown
    /// `HIVEMIND_AUTH_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_string("HIVEMIND_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(&base_url)?;

        if let Some(chat_url) = env_string("HIVEMIND_WS_URL") {
            config.chat_url = chat_url;
        }
        if let Some(agent_id) = env_string("HIVEMIND_AGENT") {
            config.agent_id = agent_id;
        }
        if let Some(mode) = env_string("HIVEMIND_AUTH_MODE") {
            config.auth.auth_mode = parse_auth_mode(&mode)?;
        }
        if let Some(region) = env_string("HIVEMIND_REGION") {
            config.auth.region = region;
        }
        config.auth.profile = env_string("HIVEMIND_PROFILE");
        config.auth.model_id = env_string("HIVEMIND_MODEL_ID");
        config.reconnect = ReconnectConfig::from_env();
        Ok(config)
    }
}

/// Parse `env`, `profile` or `keys` (case-insensitive).
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for anything else.
pub fn parse_auth_mode(value: &str) -> Result<AuthMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "env" => Ok(AuthMode::Env),
        "profile" => Ok(AuthMode::Profile),
        "keys" => Ok(AuthMode::Keys),
        _ => Err(ConfigError::Parse {
            key: "HIVEMIND_AUTH_MODE",
            value: value.to_owned(),
        }),
    }
}

/// Map an http(s) origin to the matching ws(s) URL for `path`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] for any other scheme.
pub fn ws_endpoint(base_url: &str, path: &str) -> Result<String, ConfigError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{path}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{path}"));
    }

    Err(ConfigError::InvalidBaseUrl(base_url.to_owned()))
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
