//! # Actor Identity Types
//!
//! Pure data structures shared by every layer of the actor core. Nothing in
//! this crate knows about reference counting, mailboxes or transports.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/actors
//!     ↑             ↓             ↓
//! ActorAddr     Wire format   Control blocks
//! NodeId        Frames        Handles, funnel
//! MessageId     ProtocolError Registries
//! ```
//!
//! ## What This Crate Contains
//! - [`NodeId`]: identifies one runtime instance (process)
//! - [`ActorId`]: per-node numeric actor identifier
//! - [`ActorAddr`]: the globally unique `(node, id)` pair
//! - [`MessageId`]: correlation identifier carried by every mailbox element

pub mod identifiers;
pub mod message_id;

pub use identifiers::{ActorAddr, ActorId, IdentifierError, NodeId};
pub use message_id::MessageId;
