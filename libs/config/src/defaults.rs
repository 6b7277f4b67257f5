//! Default values used when a setting is absent from every source.

/// Node display name
pub const NODE_NAME: &str = "local";

/// Log level filter when neither the config nor `RUST_LOG` sets one
pub const LOG_LEVEL: &str = "info";

/// Prefix for environment variable overrides (`ACTOR__NODE__NAME=...`)
pub const ENV_PREFIX: &str = "ACTOR";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Queue length above which the default mailbox logs a backlog warning
pub const MAILBOX_WARN_THRESHOLD: usize = 10_000;
