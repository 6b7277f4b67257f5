//! Protocol-level errors for frame and record decoding
//!
//! Each variant carries enough context to tell a truncated read apart from a
//! corrupted or foreign buffer when the error shows up in a log line.

use thiserror::Error;

/// Decoding errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Buffer is too small to contain the expected structure
    #[error("Message too small: need {need} bytes, got {got} (context: {context})")]
    MessageTooSmall {
        need: usize,
        got: usize,
        context: String,
    },

    /// Frame magic number validation failed
    #[error("Invalid magic number: expected {expected:#010x}, got {actual:#010x} (offset: {offset}, indicates: {diagnosis})")]
    InvalidMagic {
        expected: u32,
        actual: u32,
        offset: usize,
        diagnosis: String,
    },

    /// Frame version is not understood by this node
    #[error("Unsupported frame version {version}: supported versions are {supported_versions}")]
    UnsupportedVersion {
        version: u8,
        supported_versions: String,
    },

    /// Payload checksum mismatch - indicates corruption
    #[error("Checksum mismatch: expected {expected:#010x}, calculated {calculated:#010x} (payload: {payload_size} bytes)")]
    ChecksumMismatch {
        expected: u32,
        calculated: u32,
        payload_size: usize,
    },

    /// Frame kind byte is not recognized
    #[error("Unknown frame kind {kind}: valid kinds are 1 (Deliver) and 2 (Down)")]
    UnknownFrameKind { kind: u8 },

    /// Actor reference discriminator is not 0, 1 or 2
    #[error("Invalid actor reference discriminator {value} at offset {offset}: expected 0 (empty), 1 (strong) or 2 (weak)")]
    InvalidRefKind { value: u8, offset: usize },

    /// Declared length exceeds protocol limits
    #[error("Payload too large: {size} bytes exceeds limit {limit} ({context})")]
    PayloadTooLarge {
        size: usize,
        limit: usize,
        context: String,
    },

    /// String field is not valid UTF-8
    #[error("Invalid UTF-8 in {context} at offset {offset}")]
    InvalidUtf8 { offset: usize, context: String },

    /// Decoder finished with unread bytes left over
    #[error("Trailing bytes: {remaining} unread after {context}")]
    TrailingBytes { remaining: usize, context: String },

    /// General parsing error with contextual information
    #[error("Parse error at byte {offset}: {description} (context: {context})")]
    ParseError {
        offset: usize,
        description: String,
        context: String,
    },
}

impl ProtocolError {
    pub fn message_too_small(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::MessageTooSmall {
            need,
            got,
            context: context.into(),
        }
    }

    /// Create InvalidMagic error with a guess at the cause
    pub fn invalid_magic(expected: u32, actual: u32, offset: usize) -> Self {
        let diagnosis = match actual {
            0x00000000 => "uninitialized buffer",
            0xFFFFFFFF => "corrupted buffer",
            _ if actual.swap_bytes() == expected => "byte order (endianness) mismatch",
            _ => "data corruption or foreign protocol",
        };

        Self::InvalidMagic {
            expected,
            actual,
            offset,
            diagnosis: diagnosis.to_string(),
        }
    }

    pub fn unsupported_version(version: u8, supported: u8) -> Self {
        Self::UnsupportedVersion {
            version,
            supported_versions: supported.to_string(),
        }
    }

    pub fn payload_too_large(size: usize, limit: usize, context: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            size,
            limit,
            context: context.into(),
        }
    }

    pub fn parse_error(
        offset: usize,
        description: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            offset,
            description: description.into(),
            context: context.into(),
        }
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
