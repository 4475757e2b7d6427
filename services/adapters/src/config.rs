//! Configuration module for adapters
//!
//! Provides environment and TOML based configuration for the Woo adapter

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::time::Duration;
use types::CandlePeriod;

use crate::input::Channel;

/// Base configuration shared by all adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseAdapterConfig {
    /// Adapter name/identifier
    pub name: String,

    /// Whether this adapter is enabled
    pub enabled: bool,

    /// Maximum number of reconnect attempts before the transport gives up
    pub max_retries: u32,

    /// Connection timeout in milliseconds
    pub connection_timeout_ms: u64,

    /// Initial reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,

    /// Maximum reconnection delay in milliseconds
    pub max_reconnect_delay_ms: u64,
}

impl Default for BaseAdapterConfig {
    fn default() -> Self {
        Self {
            name: "adapter".to_string(),
            enabled: true,
            max_retries: 5,
            connection_timeout_ms: 10000,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 60000,
        }
    }
}

/// API key pair for private channels and signed REST calls
#[derive(Clone, Serialize, Deserialize)]
pub struct WooCredentials {
    /// Public key identifier sent as `apikey` / `x-api-key`
    pub api_key: String,
    /// HMAC secret, never logged
    pub secret: String,
}

impl fmt::Debug for WooCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WooCredentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Configuration specific to the Woo adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WooConfig {
    /// Base adapter configuration
    #[serde(flatten)]
    pub base: BaseAdapterConfig,

    /// Woo application id appended to the stream path
    pub application_id: String,

    /// Public stream base path
    pub public_stream_url: String,

    /// Private stream base path
    pub private_stream_url: String,

    /// REST API base URL
    pub rest_url: String,

    /// API credentials; private stream is used only when present
    #[serde(default)]
    pub credentials: Option<WooCredentials>,

    /// Heartbeat ping interval
    pub ping_interval_ms: u64,

    /// Minimum spacing between throttled outbound frames
    pub send_throttle_ms: u64,

    /// Minimum spacing between REST requests
    pub rest_throttle_ms: u64,

    /// Candle interval used for kline subscriptions
    #[serde(default)]
    pub candle_period: CandlePeriod,

    /// Markets the service binary subscribes to, e.g. "BTC_USDT"
    #[serde(default)]
    pub markets: Vec<String>,

    /// Channels the service binary subscribes to
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Default for WooConfig {
    fn default() -> Self {
        Self {
            base: BaseAdapterConfig {
                name: "woo".to_string(),
                enabled: true,
                max_retries: 10,
                connection_timeout_ms: 5000,
                reconnect_delay_ms: 1000,
                max_reconnect_delay_ms: 30000,
            },
            application_id: String::new(),
            public_stream_url: "wss://wss.woo.org/ws/stream/".to_string(),
            private_stream_url: "wss://wss.woo.org/v2/ws/private/stream/".to_string(),
            rest_url: "https://api.woo.org/".to_string(),
            credentials: None,
            ping_interval_ms: 10000,
            send_throttle_ms: 10,
            rest_throttle_ms: 250,
            candle_period: CandlePeriod::OneMinute,
            markets: vec!["BTC_USDT".to_string()],
            channels: vec![Channel::Ticker, Channel::Trade],
        }
    }
}

impl WooConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from TOML file with environment variable overrides
    pub fn from_toml_with_env_overrides(path: &str) -> anyhow::Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        let mut config: WooConfig =
            toml::from_str(&config_str).context("Failed to parse TOML configuration")?;

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = env::var("WOO_APPLICATION_ID") {
            self.application_id = id;
        }

        if let Ok(url) = env::var("WOO_WS_URL") {
            self.public_stream_url = url;
        }

        if let Ok(url) = env::var("WOO_PRIVATE_WS_URL") {
            self.private_stream_url = url;
        }

        if let Ok(url) = env::var("WOO_REST_URL") {
            self.rest_url = url;
        }

        if let (Ok(api_key), Ok(secret)) = (env::var("WOO_API_KEY"), env::var("WOO_API_SECRET")) {
            self.credentials = Some(WooCredentials { api_key, secret });
        }

        if let Ok(markets) = env::var("WOO_MARKETS") {
            self.markets = markets
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(channels) = env::var("WOO_CHANNELS") {
            let parsed: Vec<Channel> = channels
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if !parsed.is_empty() {
                self.channels = parsed;
            }
        }

        if let Some(ms) = env::var("WOO_PING_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.ping_interval_ms = ms;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_id.is_empty() {
            return Err("Application id cannot be empty".to_string());
        }

        for url in [&self.public_stream_url, &self.private_stream_url] {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(format!("WebSocket URL must start with ws:// or wss://: {}", url));
            }
        }

        if !self.rest_url.starts_with("http://") && !self.rest_url.starts_with("https://") {
            return Err(format!("REST URL must start with http:// or https://: {}", self.rest_url));
        }

        if self.ping_interval_ms == 0 {
            return Err("Ping interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Stream endpoint for this session: private path when credentials are set
    pub fn stream_url(&self) -> String {
        let base = if self.credentials.is_some() {
            &self.private_stream_url
        } else {
            &self.public_stream_url
        };
        format!("{}{}", base, self.application_id)
    }

    /// Heartbeat interval
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Outbound frame spacing
    pub fn send_throttle(&self) -> Duration {
        Duration::from_millis(self.send_throttle_ms)
    }

    /// REST request spacing
    pub fn rest_throttle(&self) -> Duration {
        Duration::from_millis(self.rest_throttle_ms)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.base.connection_timeout_ms)
    }
}
