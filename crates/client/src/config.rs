//! Client-side settings and the combined startup configuration.

use std::time::Duration;

use trackhub_backend::{BackendConfig, ConfigError};

/// Timing and policy knobs for the live core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long the store waits for a session before clearing `loading`.
    pub auth_timeout: Duration,
    /// How long a notification stays visible.
    pub toast_duration: Duration,
    /// Raise an error notification when anonymous sign-in fails.
    pub notify_auth_failure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(2),
            toast_duration: Duration::from_secs(4),
            notify_auth_failure: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve overrides through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ms) = lookup("TRACKHUB_AUTH_TIMEOUT_MS") {
            config.auth_timeout = parse_millis("TRACKHUB_AUTH_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("TRACKHUB_TOAST_MS") {
            config.toast_duration = parse_millis("TRACKHUB_TOAST_MS", &ms)?;
        }
        if let Some(flag) = lookup("TRACKHUB_NOTIFY_AUTH_FAILURE") {
            config.notify_auth_failure = parse_flag("TRACKHUB_NOTIFY_AUTH_FAILURE", &flag)?;
        }
        Ok(config)
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_toast_duration(mut self, duration: Duration) -> Self {
        self.toast_duration = duration;
        self
    }

    pub fn with_auth_failure_notifications(mut self, enabled: bool) -> Self {
        self.notify_auth_failure = enabled;
        self
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, format!("expected milliseconds: {e}")))?;
    if ms == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("expected a boolean, got '{other}'"))),
    }
}

/// Everything resolved at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            backend: BackendConfig::from_lookup(&lookup)?,
            client: ClientConfig::from_lookup(&lookup)?,
        })
    }
}
