//! Client configuration from the environment

use crate::state_machine::{ReconnectPolicy, SessionContext, DEFAULT_NOTICE_TTL};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a ws:// or wss:// URL, got {value:?}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("{key} must be a positive number of milliseconds, got {value:?}")]
    InvalidDuration { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect: ReconnectPolicy,
    pub notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = match lookup("BALLOT_SERVER_URL") {
            Some(raw) => normalize_url("BALLOT_SERVER_URL", &raw)?,
            None => DEFAULT_SERVER_URL.to_string(),
        };

        let delay = millis(&lookup, "BALLOT_RECONNECT_DELAY_MS")?
            .unwrap_or(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS));
        let reconnect = match millis(&lookup, "BALLOT_RECONNECT_MAX_MS")? {
            Some(max) if max > delay => ReconnectPolicy::exponential(delay, max),
            _ => ReconnectPolicy::constant(delay),
        };

        let notice_ttl = millis(&lookup, "BALLOT_NOTICE_DISMISS_MS")?.unwrap_or(DEFAULT_NOTICE_TTL);

        Ok(Self {
            server_url,
            reconnect,
            notice_ttl,
        })
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.reconnect, self.notice_ttl)
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err(ConfigError::InvalidDuration { key, value: raw }),
    }
}

/// Validate the scheme and default the path to `/ws`
fn normalize_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = raw.trim();
    let invalid = || ConfigError::InvalidUrl {
        key,
        value: raw.to_string(),
    };

    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .ok_or_else(invalid)?;
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() {
        return Err(invalid());
    }

    if path.is_empty() {
        Ok(format!("{}/ws", url.trim_end_matches('/')))
    } else {
        Ok(url.to_string())
    }
}
