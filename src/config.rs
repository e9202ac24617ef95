//! # Configuration Management
//!
//! Centralized configuration for the client protocol engine.
//!
//! ## Configuration Sources
//! - TOML files via [`NetworkConfig::from_file`]
//! - TOML strings via [`NetworkConfig::from_toml`]
//! - Environment variables via [`NetworkConfig::from_env`]
//! - Direct instantiation with defaults
//!
//! Durations are written in milliseconds in TOML.

use crate::error::{ProtocolError, Result};
use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::pipeline::framing::DEFAULT_MAX_PACKET_SIZE;
use crate::protocol::registry::PROTOCOL_VERSION_1_16_1;
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default server port.
pub const DEFAULT_PORT: u16 = 25565;

/// Socket read size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default view distance in chunks.
pub const DEFAULT_VIEW_DISTANCE: i32 = 10;

const EXAMPLE_HEADER: &str = "\
# mc-protocol client configuration
# Durations are in milliseconds. Omitted keys take their defaults.
";

/// Top-level configuration, one table per concern.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NetworkConfig {
    pub client: ClientConfig,
    pub world: WorldConfig,
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Reads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid configuration TOML: {e}")))
    }

    /// Defaults overridden by `MC_PROTOCOL_*` environment variables.
    ///
    /// Unparseable numeric values are rejected rather than ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MC_PROTOCOL_HOST") {
            config.client.host = host;
        }

        if let Ok(port) = std::env::var("MC_PROTOCOL_PORT") {
            config.client.port = parse_env("MC_PROTOCOL_PORT", &port)?;
        }

        if let Ok(timeout) = std::env::var("MC_PROTOCOL_CONNECT_TIMEOUT_MS") {
            let millis: u64 = parse_env("MC_PROTOCOL_CONNECT_TIMEOUT_MS", &timeout)?;
            config.client.connect_timeout = Duration::from_millis(millis);
        }

        if let Ok(distance) = std::env::var("MC_PROTOCOL_VIEW_DISTANCE") {
            config.world.view_distance = parse_env("MC_PROTOCOL_VIEW_DISTANCE", &distance)?;
        }

        Ok(config)
    }

    /// Defaults with `edit` applied on top.
    pub fn default_with_overrides(edit: impl FnOnce(&mut Self)) -> Self {
        let mut config = Self::default();
        edit(&mut config);
        config
    }

    /// A commented TOML template holding every default.
    pub fn example_config() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!("{EXAMPLE_HEADER}\n{body}")
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Cannot encode configuration: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            ProtocolError::ConfigError(format!("Cannot write {}: {e}", path.display()))
        })
    }

    /// Returns every problem found. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.client.validate();
        errors.extend(self.world.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// [`validate`](Self::validate) folded into a single `ConfigError`.
    pub fn validate_strict(&self) -> Result<()> {
        match self.validate().as_slice() {
            [] => Ok(()),
            problems => Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed ({} problems): {}",
                problems.len(),
                problems.join("; ")
            ))),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::ConfigError(format!("Invalid value for {name}: '{value}'")))
}

/// Connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP, also sent in the handshake
    pub host: String,

    pub port: u16,

    /// Protocol version sent in the handshake
    pub protocol_version: i32,

    /// Bound on establishing the TCP connection
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Bytes requested per socket read
    pub read_buffer_size: usize,

    /// Largest framed packet accepted or sent
    pub max_packet_size: usize,

    /// Events buffered per event-bus subscriber
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_PORT,
            protocol_version: PROTOCOL_VERSION_1_16_1,
            connect_timeout: timeout::DEFAULT_CONNECT_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("Host cannot be empty".to_string());
        } else if self.host.len() >= 255 {
            errors.push(format!(
                "Host too long: {} characters (maximum: 254)",
                self.host.len()
            ));
        }

        if self.port == 0 {
            errors.push("Port must be greater than 0".to_string());
        }

        if self.protocol_version <= 0 {
            errors.push(format!(
                "Invalid protocol version: {}",
                self.protocol_version
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 60 {
            errors.push("Connect timeout too long (maximum: 60s)".to_string());
        }

        if self.read_buffer_size < 64 {
            errors.push("Read buffer size too small (minimum: 64 bytes)".to_string());
        } else if self.read_buffer_size > 1024 * 1024 {
            errors.push("Read buffer size too large (maximum: 1 MB)".to_string());
        }

        if self.max_packet_size < 1024 {
            errors.push("Max packet size too small (minimum: 1 KB)".to_string());
        } else if self.max_packet_size > i32::MAX as usize {
            errors.push(format!(
                "Max packet size too large: {} bytes (must fit in a VarInt)",
                self.max_packet_size
            ));
        }

        if self.event_capacity == 0 {
            errors.push("Event capacity must be greater than 0".to_string());
        }

        errors
    }
}

/// Chunk assembly settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// View distance in chunks, updated later by the server
    pub view_distance: i32,

    /// Packed chunks to collect before the initial bulk unpack.
    /// `None` uses `(2 * view_distance + 3)^2`.
    pub chunk_quota: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            view_distance: DEFAULT_VIEW_DISTANCE,
            chunk_quota: None,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(0..=64).contains(&self.view_distance) {
            errors.push(format!(
                "Invalid view distance: {} (valid range: 0-64)",
                self.view_distance
            ));
        }

        if self.chunk_quota == Some(0) {
            errors.push("Chunk quota must be greater than 0".to_string());
        }

        errors
    }
}

/// Subscriber settings consumed by [`crate::utils::logging::init`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Reported once when the subscriber is installed
    pub app_name: String,

    /// Used when `RUST_LOG` is unset
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Emit JSON lines instead of the human-readable format
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let name_len = self.app_name.trim().chars().count();
        if name_len == 0 {
            vec!["Application name cannot be empty".to_string()]
        } else if name_len > 64 {
            vec![format!("Application name is {name_len} characters (maximum: 64)")]
        } else {
            Vec::new()
        }
    }
}

/// `Duration` as whole milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `tracing::Level` as a lowercase name such as `"debug"`.
mod log_level_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Level>()
            .map_err(|_| D::Error::custom(format!("unknown log level '{name}'")))
    }
}
