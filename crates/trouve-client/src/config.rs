//! Client configuration with environment overrides.
//!
//! Every setting has a default matching the deployed backend, so the client
//! starts with zero configuration in development. All timing parameters are
//! plain fields so tests can shrink them without touching any state machine.

use std::time::Duration;

use trouve_shared::constants::{
    DEFAULT_API_URL, DEFAULT_WS_URL, HEARTBEAT_INTERVAL_SECS, POLL_INTERVAL_SECS,
    RECONNECT_DELAY_SECS, REQUEST_TIMEOUT_SECS,
};

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    /// Env: `TROUVE_API_URL`
    /// Default: `http://localhost:8000`
    pub api_url: String,

    /// Base URL of the push endpoint; username and token are appended.
    /// Env: `TROUVE_WS_URL`
    /// Default: `ws://localhost:8000/ws`
    pub ws_url: String,

    /// Interval between keep-alive pings on the push channel.
    pub heartbeat_interval: Duration,

    /// Fixed delay before the push channel re-dials after a close.
    pub reconnect_delay: Duration,

    /// Cadence of the fallback polling timers.
    pub poll_interval: Duration,

    /// Timeout applied to every REST request (`Duration::ZERO` disables).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `TROUVE_API_URL` / `TROUVE_WS_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TROUVE_API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = std::env::var("TROUVE_WS_URL") {
            config.ws_url = url;
        }
        config
    }
}
