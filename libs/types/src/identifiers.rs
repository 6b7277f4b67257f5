//! Actor and node identifiers.
//!
//! An [`ActorAddr`] is created exactly once, when the hosting system allocates
//! a control block, and is never mutated afterwards. Equality, ordering and
//! hashing are defined purely on `(node, id)` so addresses work as map keys on
//! every node that has seen them.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors produced when parsing identifiers from text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid node id '{input}': {reason}")]
    InvalidNodeId { input: String, reason: String },

    #[error("Invalid actor address '{input}': expected <id>@<node>")]
    InvalidAddress { input: String },

    #[error("Actor id 0 is reserved")]
    ReservedActorId,
}

/// Identifies the runtime instance (process) that created an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(Uuid);

impl NodeId {
    /// Number of bytes a node id occupies on the wire
    pub const SIZE: usize = 16;

    /// Create a fresh random node id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        self.0.as_bytes()
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.as_bytes()[..4])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for NodeId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdentifierError::InvalidNodeId {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Per-node actor identifier, never reused during the node's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActorId(u64);

impl ActorId {
    /// Reserved value, never handed out by an actor system
    pub const INVALID: ActorId = ActorId(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActorId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Globally unique actor address
///
/// Field order matters: the derived `Ord` compares the node first, then the
/// local id, which keeps the ordering consistent with equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActorAddr {
    node: NodeId,
    id: ActorId,
}

impl ActorAddr {
    pub const fn new(node: NodeId, id: ActorId) -> Self {
        Self { node, id }
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// True if this address was created by `node`
    pub fn is_hosted_on(&self, node: &NodeId) -> bool {
        self.node == *node
    }
}

impl fmt::Display for ActorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.node)
    }
}

impl FromStr for ActorAddr {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, node) = s
            .split_once('@')
            .ok_or_else(|| IdentifierError::InvalidAddress { input: s.to_string() })?;
        let id: u64 = id
            .parse()
            .map_err(|_| IdentifierError::InvalidAddress { input: s.to_string() })?;
        if id == 0 {
            return Err(IdentifierError::ReservedActorId);
        }
        Ok(Self::new(node.parse()?, ActorId::new(id)))
    }
}
