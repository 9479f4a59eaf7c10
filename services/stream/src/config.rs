//! Configuration for the stream service.
//!
//! Plain struct with defaults matching the production feed, environment
//! overrides under the `PULSE_` prefix, and validation at startup.

use serde::{Deserialize, Serialize};
use std::env;

/// Stream service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// WebSocket feed endpoint.
    pub ws_url: String,

    /// REST API base URL for the catalog and ticker snapshots.
    pub rest_url: String,

    /// Transport open timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Initial reconnection delay in milliseconds.
    pub base_backoff_ms: u64,

    /// Maximum reconnection delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Keep-alive interval in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Price levels retained per orderbook side.
    pub orderbook_depth: usize,

    /// Orderbook emission throttle window in milliseconds.
    pub orderbook_throttle_ms: u64,

    /// Trades retained in the live feed.
    pub trade_history_limit: usize,

    /// How long a freshly inserted trade stays flagged recent, in
    /// milliseconds.
    pub trade_highlight_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://socket.delta.exchange".to_string(),
            rest_url: "https://api.delta.exchange".to_string(),
            connect_timeout_ms: 10_000,
            base_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            heartbeat_interval_ms: 25_000,
            orderbook_depth: 10,
            orderbook_throttle_ms: 150,
            trade_history_limit: 30,
            trade_highlight_ms: 500,
        }
    }
}

impl StreamConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ws_url: env::var("PULSE_WS_URL").unwrap_or(defaults.ws_url),
            rest_url: env::var("PULSE_REST_URL").unwrap_or(defaults.rest_url),
            connect_timeout_ms: env_u64("PULSE_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            base_backoff_ms: env_u64("PULSE_BASE_BACKOFF_MS", defaults.base_backoff_ms),
            max_backoff_ms: env_u64("PULSE_MAX_BACKOFF_MS", defaults.max_backoff_ms),
            heartbeat_interval_ms: env_u64(
                "PULSE_HEARTBEAT_INTERVAL_MS",
                defaults.heartbeat_interval_ms,
            ),
            orderbook_depth: env_u64("PULSE_ORDERBOOK_DEPTH", defaults.orderbook_depth as u64)
                as usize,
            orderbook_throttle_ms: env_u64(
                "PULSE_ORDERBOOK_THROTTLE_MS",
                defaults.orderbook_throttle_ms,
            ),
            trade_history_limit: env_u64(
                "PULSE_TRADE_HISTORY_LIMIT",
                defaults.trade_history_limit as u64,
            ) as usize,
            trade_highlight_ms: env_u64("PULSE_TRADE_HIGHLIGHT_MS", defaults.trade_highlight_ms),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err("WebSocket URL must start with ws:// or wss://".to_string());
        }

        if !self.rest_url.starts_with("http://") && !self.rest_url.starts_with("https://") {
            return Err("REST URL must start with http:// or https://".to_string());
        }

        if url::Url::parse(&self.ws_url).is_err() {
            return Err(format!("Invalid WebSocket URL: {}", self.ws_url));
        }

        if self.base_backoff_ms == 0 {
            return Err("Base backoff must be greater than 0".to_string());
        }

        if self.max_backoff_ms < self.base_backoff_ms {
            return Err("Max backoff must be at least the base backoff".to_string());
        }

        if self.orderbook_depth == 0 {
            return Err("Orderbook depth must be greater than 0".to_string());
        }

        if self.trade_history_limit == 0 {
            return Err("Trade history limit must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
