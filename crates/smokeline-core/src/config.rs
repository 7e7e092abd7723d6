//! Configuration model
//!
//! Loaded from a TOML file and then overridden from the environment. A
//! missing file yields defaults; every section and every field is optional.
//!
//! ```toml
//! [sensor]
//! mode = "hardware"
//! serial_path = "/dev/ttyUSB0"
//!
//! [bridge]
//! decimation_threshold = 11
//!
//! [cloud]
//! channel_url = "wss://example.invalid/socket"
//! api_url = "https://example.invalid/api/"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{Result, SmokelineError};
use crate::reliability::RetryPolicy;

/// Environment variable overriding [`CloudConfig::channel_url`]
pub const ENV_CLOUD_URL: &str = "SMOKELINE_CLOUD_URL";
/// Environment variable overriding [`CloudConfig::api_url`]
pub const ENV_CLOUD_API_URL: &str = "SMOKELINE_CLOUD_API_URL";
/// Environment variable overriding [`SensorConfig::mode`]
pub const ENV_SENSOR_MODE: &str = "SMOKELINE_SENSOR_MODE";
/// Environment variable overriding [`SensorConfig::serial_path`]
pub const ENV_SERIAL_PORT: &str = "SMOKELINE_SERIAL_PORT";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokelineConfig {
    /// Sensor host settings
    pub sensor: SensorConfig,
    /// Local relay settings
    pub relay: RelayConfig,
    /// Display bridge settings
    pub bridge: BridgeConfig,
    /// Cloud endpoints
    pub cloud: CloudConfig,
}

impl SmokelineConfig {
    /// Load from `path`, then apply environment overrides.
    ///
    /// A missing file is not an error; a file that fails to parse is.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(err) => {
                return Err(SmokelineError::config(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_CLOUD_URL) {
            self.cloud.channel_url = url;
        }
        if let Some(url) = get(ENV_CLOUD_API_URL) {
            self.cloud.api_url = url;
        }
        if let Some(mode) = get(ENV_SENSOR_MODE) {
            self.sensor.mode = mode.parse()?;
        }
        if let Some(port) = get(ENV_SERIAL_PORT) {
            self.sensor.serial_path = port;
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bridge.decimation_threshold == 0 {
            return Err(SmokelineError::config(
                "bridge.decimation_threshold must be at least 1",
            ));
        }
        if self.bridge.max_buffered == 0 {
            return Err(SmokelineError::config("bridge.max_buffered must be at least 1"));
        }
        if self.sensor.emit_interval_ms == 0 {
            return Err(SmokelineError::config("sensor.emit_interval_ms must be at least 1"));
        }
        if self.relay.capacity == 0 {
            return Err(SmokelineError::config("relay.capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Where readings come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Synthetic readings on a timer
    #[default]
    Emulator,
    /// Lines from the serial sensor interface
    Hardware,
}

impl FromStr for SensorMode {
    type Err = SmokelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "emulator" | "local" => Ok(Self::Emulator),
            "hardware" => Ok(Self::Hardware),
            other => Err(SmokelineError::config(format!(
                "unknown sensor mode '{other}' (expected emulator or hardware)"
            ))),
        }
    }
}

/// Sensor host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Emulator or hardware
    pub mode: SensorMode,
    /// Emulator cadence
    pub emit_interval_ms: u64,
    /// Serial device path
    pub serial_path: String,
    /// Serial baud rate
    pub baud_rate: u32,
}

impl SensorConfig {
    /// Emulator cadence as a duration
    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mode: SensorMode::Emulator,
            emit_interval_ms: 500,
            serial_path: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        }
    }
}

/// Local relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the relay listens on
    pub bind: String,
    /// Frames buffered per client before a slow client starts missing frames
    pub capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5678".to_string(),
            capacity: 64,
        }
    }
}

/// Display bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// WebSocket URL of the local relay
    pub relay_url: String,
    /// One reading is buffered per this many offline readings
    pub decimation_threshold: u32,
    /// Upper bound on buffered readings; the oldest is evicted beyond it
    pub max_buffered: usize,
    /// Upper bound on the local history cache
    pub history_limit: usize,
    /// Retry policy for the durable batch write
    pub flush_retry: RetryPolicy,
    /// `host:port` the network indicator dials
    pub probe_target: String,
    /// Timeout for one network indicator check
    pub probe_timeout_ms: u64,
}

impl BridgeConfig {
    /// Network indicator timeout as a duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:5678".to_string(),
            decimation_threshold: 11,
            max_buffered: 10_000,
            history_limit: 2_000,
            flush_retry: RetryPolicy::exponential()
                .with_max_attempts(4)
                .with_initial_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(10)),
            probe_target: "1.1.1.1:53".to_string(),
            probe_timeout_ms: 2_000,
        }
    }
}

/// Cloud endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// WebSocket URL of the cloud channel
    pub channel_url: String,
    /// Base URL of the durable HTTP API
    pub api_url: String,
    /// Connect and request timeout
    pub timeout_ms: u64,
    /// Reconnect pacing for the cloud channel
    pub reconnect: ReconnectConfig,
}

impl CloudConfig {
    /// Connect and request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            channel_url: "ws://127.0.0.1:3001".to_string(),
            api_url: "http://127.0.0.1:3001/api/".to_string(),
            timeout_ms: 10_000,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (e.g., 2.0 for doubling)
    pub backoff_multiplier: f64,
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (1-based), capped at the maximum.
    pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let delay = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}
