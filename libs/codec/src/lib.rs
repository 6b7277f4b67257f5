//! # Actor Core Wire Codec
//!
//! ## Purpose
//!
//! The "rules" layer between the pure identity types and the actor runtime:
//! - Byte-level encoding primitives ([`WireWriter`], [`WireReader`])
//! - Transport frame header with magic, version and CRC32 checksum
//! - The logical actor reference record (discriminator + address)
//! - Protocol error type shared by every decoder
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/actors
//!     ↑           ↓             ↓
//! ActorAddr   Frames        Resolution of records
//! NodeId      RefRecords    against local registries
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Resolution of addresses into live handles (needs a running system)
//! - Socket management or connection handling
//! - Message content semantics
//!
//! All integers are little endian; strings and byte blobs are `u32`
//! length-prefixed.

pub mod actor_ref;
pub mod buffers;
pub mod constants;
pub mod error;
pub mod frame;

pub use actor_ref::{ActorRefRecord, RefKind};
pub use buffers::{WireReader, WireWriter};
pub use constants::*;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{decode_frame, encode_frame, FrameHeader, FrameKind};
