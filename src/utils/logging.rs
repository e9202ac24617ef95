//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber configured from `config`.
///
/// `RUST_LOG` overrides the configured level when set. Calling this again
/// after a subscriber is installed is a no-op.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_str().to_lowercase()))
        .map_err(|e| ProtocolError::ConfigError(format!("Invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_ok() {
        tracing::info!(app = %config.app_name, "Logging initialized");
    }
    Ok(())
}
