//! Logging initialisation
//!
//! `RUST_LOG` wins over the configured level so operators can raise
//! verbosity without editing the node config.

use crate::runtime_config::LoggingSettings;
use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Build the level filter for the given settings
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("Invalid log level '{}'", settings.level)),
    }
}

/// Install the global tracing subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = env_filter(settings)?;

    let installed = if settings.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        let settings = LoggingSettings {
            level: "actors=debug,info".to_string(),
            json: false,
        };
        assert!(env_filter(&settings).is_ok());
    }
}
