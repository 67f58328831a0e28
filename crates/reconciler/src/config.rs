//! Client configuration loaded from the environment, with the reconciler
//! timings it carries.

use std::time::Duration;

use crate::error::ConfigError;

/// Default delay before the one-shot status check after submission.
const DEFAULT_IMMEDIATE_CHECK_DELAY_MS: u64 = 1000;

/// Default period of the fallback poll.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Timing of the reconciler's pull channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub immediate_check_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            immediate_check_delay: Duration::from_millis(DEFAULT_IMMEDIATE_CHECK_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL HTTP endpoint.
    pub api_url: String,
    /// GraphQL WebSocket endpoint.
    pub realtime_url: String,
    /// Sent as the `Authorization` header and in `connection_init`.
    pub auth_token: Option<String>,
    pub reconciler: ReconcilerConfig,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                       |
    /// |----------------------------|-------------------------------|
    /// | `ANALYTICS_API_URL`        | required                      |
    /// | `ANALYTICS_REALTIME_URL`   | API URL with `http` -> `ws`   |
    /// | `ANALYTICS_AUTH_TOKEN`     | none                          |
    /// | `POLL_INTERVAL_MS`         | `1000`                        |
    /// | `IMMEDIATE_CHECK_DELAY_MS` | `1000`                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = var("ANALYTICS_API_URL").ok_or(ConfigError::Missing("ANALYTICS_API_URL"))?;
        let realtime_url = match var("ANALYTICS_REALTIME_URL") {
            Some(url) => url,
            None => realtime_url_for(&api_url)?,
        };
        let auth_token = var("ANALYTICS_AUTH_TOKEN");

        let reconciler = ReconcilerConfig {
            immediate_check_delay: millis(
                "IMMEDIATE_CHECK_DELAY_MS",
                var("IMMEDIATE_CHECK_DELAY_MS"),
                DEFAULT_IMMEDIATE_CHECK_DELAY_MS,
            )?,
            poll_interval: millis(
                "POLL_INTERVAL_MS",
                var("POLL_INTERVAL_MS"),
                DEFAULT_POLL_INTERVAL_MS,
            )?,
        };
        if reconciler.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_MS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            api_url,
            realtime_url,
            auth_token,
            reconciler,
        })
    }
}

/// Swap the HTTP scheme of `api_url` for its WebSocket counterpart.
fn realtime_url_for(api_url: &str) -> Result<String, ConfigError> {
    if let Some(rest) = api_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else {
        Err(ConfigError::Invalid {
            var: "ANALYTICS_API_URL",
            value: api_url.to_string(),
            reason: "expected an http:// or https:// URL".into(),
        })
    }
}

fn millis(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_millis(default));
    };
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        })
}
