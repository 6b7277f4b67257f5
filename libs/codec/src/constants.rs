//! # Protocol Constants
//!
//! Values that define the frame format. They must stay stable across every
//! node participating in one cluster.

/// Magic number at the start of every frame
pub const FRAME_MAGIC: u32 = 0xAC70_12EF;

/// Current frame format version
pub const PROTOCOL_VERSION: u8 = 1;

/// magic(4) + version(1) + kind(1) + source node(16) + payload len(4) + checksum(4)
pub const FRAME_HEADER_SIZE: usize = 30;

/// Largest payload a single frame may carry (16 MiB)
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

/// Largest length-prefixed string accepted by the reader
pub const MAX_STRING_LEN: usize = 64 * 1024;

/// Encoded size of a non-empty actor reference record: kind + node + id
pub const ACTOR_REF_RECORD_SIZE: usize = 1 + 16 + 8;
