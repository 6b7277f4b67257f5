//! Runtime Configuration Module
//!
//! Loads node configuration from an optional TOML file with environment
//! variable overrides (`ACTOR__` prefix, `__` between nested keys). Every
//! field has a default, so an empty source set yields a usable config.

use crate::defaults;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use types::NodeId;

/// Main runtime configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub node: NodeSettings,
    pub delivery: DeliverySettings,
    pub logging: LoggingSettings,
}

/// Identity of the hosting node
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NodeSettings {
    /// Human readable name, only used in logs
    pub name: String,

    /// Fixed node id (UUID text); a random id is generated when absent
    pub id: Option<String>,
}

/// What happens to messages whose recipient can no longer accept them
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterPolicy {
    /// Discard silently (logged at debug level)
    #[default]
    Drop,
    /// Hand the message to the system's dead-letter channel
    Forward,
}

/// Delivery funnel settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeliverySettings {
    pub dead_letter_policy: DeadLetterPolicy,

    /// Backlog length at which the default mailbox starts warning
    pub mailbox_warn_threshold: usize,
}

/// Logging output settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level or full `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: defaults::NODE_NAME.to_string(),
            id: None,
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            dead_letter_policy: DeadLetterPolicy::default(),
            mailbox_warn_threshold: defaults::MAILBOX_WARN_THRESHOLD,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl NodeSettings {
    /// Parse the configured node id, if any
    pub fn node_id(&self) -> Result<Option<NodeId>> {
        self.id
            .as_deref()
            .map(|raw| {
                raw.parse::<NodeId>()
                    .with_context(|| format!("Invalid node.id '{}'", raw))
            })
            .transpose()
    }
}

impl RuntimeConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading runtime config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        } else {
            debug!("No config file given, using defaults and environment");
        }

        let config = builder
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Parse configuration from TOML text, still applying environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn environment() -> Environment {
        Environment::with_prefix(defaults::ENV_PREFIX)
            .prefix_separator(defaults::ENV_SEPARATOR)
            .separator(defaults::ENV_SEPARATOR)
            .try_parsing(true)
    }
}
