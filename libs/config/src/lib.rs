//! # Actor Core Configuration
//!
//! Centralized configuration for a node hosting an actor system.
//!
//! ## Features
//!
//! - **Node settings**: display name and an optional fixed node id
//! - **Delivery settings**: what happens to messages for dead actors
//! - **Logging settings**: level filter and output format
//!
//! ## Usage
//!
//! ```rust,no_run
//! use runtime_config::{logging, RuntimeConfig};
//!
//! let config = RuntimeConfig::load(Some("config/node.toml".as_ref()))?;
//! logging::init_logging(&config.logging)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod logging;
pub mod runtime_config;

pub use runtime_config::{
    DeadLetterPolicy, DeliverySettings, LoggingSettings, NodeSettings, RuntimeConfig,
};
