//! Error types for the actor runtime
//!
//! Liveness misses (dead recipient, unknown id) are not errors; they resolve
//! to `None` or to the dead-letter policy. Everything else is an
//! [`ActorError`].

use codec::ProtocolError;
use thiserror::Error;
use types::NodeId;

pub type Result<T> = std::result::Result<T, ActorError>;

/// Actor runtime errors
#[derive(Debug, Error)]
pub enum ActorError {
    /// Wire-format problem in an inbound frame
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No route to the given node
    #[error("Node {node} is not reachable: {reason}")]
    UnreachableNode { node: NodeId, reason: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },
}

impl ActorError {
    /// Create an unreachable node error
    pub fn unreachable(node: NodeId, reason: impl Into<String>) -> Self {
        Self::UnreachableNode {
            node,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }
}
