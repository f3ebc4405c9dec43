//! Client configuration.
//!
//! Values come from [`ClientConfig::default`], optionally overridden from
//! environment variables (see [`ClientConfig::from_env`]). A `.env` file is
//! honored when the binary loads it with `dotenvy` before reading the config.

use std::str::FromStr;
use std::time::Duration;

use crate::world::BASE_CELL_SIZE;

/// Development relay endpoint
pub const DEFAULT_DEV_URL: &str = "ws://localhost:3000";

/// Production relay endpoint
pub const DEFAULT_PROD_URL: &str = "wss://localhost:3000";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown environment: {0} (expected development or production)")]
    UnknownEnvironment(String),
}

/// Build environment, which selects the relay endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Configuration for the sync client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Relay endpoint used in development
    pub dev_url: String,
    /// Relay endpoint used in production
    pub prod_url: String,
    /// Explicit endpoint, overriding the environment choice
    pub relay_url: Option<String>,
    /// Minimum spacing of outbound target changes
    pub target_throttle: Duration,
    /// Period of the full player record resync
    pub heartbeat_interval: Duration,
    /// Delay between reconnect attempts of the WebSocket transport
    pub reconnect_delay: Duration,
    pub cell_size: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            dev_url: DEFAULT_DEV_URL.to_string(),
            prod_url: DEFAULT_PROD_URL.to_string(),
            relay_url: None,
            target_throttle: Duration::from_millis(1000),
            heartbeat_interval: Duration::from_millis(2000),
            reconnect_delay: Duration::from_millis(1000),
            cell_size: BASE_CELL_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(env) = lookup("PLAYGROUND_ENV") {
            config.environment = env.parse()?;
        }
        if let Some(url) = lookup("RELAY_URL_DEV") {
            config.dev_url = url;
        }
        if let Some(url) = lookup("RELAY_URL_PROD") {
            config.prod_url = url;
        }
        config.relay_url = lookup("RELAY_URL").filter(|url| !url.is_empty());

        if let Some(ms) = parse_var(&lookup, "TARGET_THROTTLE_MS")? {
            config.target_throttle = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "HEARTBEAT_INTERVAL_MS")? {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "RECONNECT_DELAY_MS")? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var::<f64, _>(&lookup, "CELL_SIZE")? {
            if size <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: "CELL_SIZE",
                    value: size.to_string(),
                });
            }
            config.cell_size = size;
        }

        Ok(config)
    }

    /// Endpoint to connect to
    pub fn endpoint(&self) -> &str {
        if let Some(url) = &self.relay_url {
            return url;
        }
        match self.environment {
            Environment::Development => &self.dev_url,
            Environment::Production => &self.prod_url,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = Some(url.into());
        self
    }

    pub fn with_target_throttle(mut self, window: Duration) -> Self {
        self.target_throttle = window;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
