//! Transport frame header
//!
//! ```text
//! ┌────────┬─────────┬──────┬─────────────┬─────────────┬──────────┬─────────┐
//! │ magic  │ version │ kind │ source node │ payload len │ checksum │ payload │
//! │ u32    │ u8      │ u8   │ [u8; 16]    │ u32         │ u32 crc  │ ...     │
//! └────────┴─────────┴──────┴─────────────┴─────────────┴──────────┴─────────┘
//! ```
//!
//! The checksum covers the payload only. Frames are validated in header
//! order so a foreign buffer fails on the magic before anything else.

use crate::buffers::{WireReader, WireWriter};
use crate::constants::{FRAME_HEADER_SIZE, FRAME_MAGIC, MAX_FRAME_PAYLOAD, PROTOCOL_VERSION};
use crate::error::{ProtocolError, ProtocolResult};
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::{debug, trace};
use types::NodeId;

/// Frame payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FrameKind {
    /// Mailbox element for an actor hosted on the receiving node
    Deliver = 1,
    /// Notification that an actor on the sending node is gone
    Down = 2,
}

/// Validated frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub source: NodeId,
    pub payload_len: u32,
    pub checksum: u32,
}

/// Wrap `payload` in a frame header
pub fn encode_frame(kind: FrameKind, source: &NodeId, payload: &[u8]) -> ProtocolResult<Bytes> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(ProtocolError::payload_too_large(
            payload.len(),
            MAX_FRAME_PAYLOAD,
            "frame payload",
        ));
    }

    let mut w = WireWriter::with_capacity(FRAME_HEADER_SIZE + payload.len());
    w.put_u32(FRAME_MAGIC);
    w.put_u8(PROTOCOL_VERSION);
    w.put_u8(kind.into());
    w.put_node_id(source);
    w.put_u32(payload.len() as u32);
    w.put_u32(crc32fast::hash(payload));
    w.put_raw(payload);
    Ok(w.freeze())
}

/// Validate a frame and return its header and payload
pub fn decode_frame(data: &[u8]) -> ProtocolResult<(FrameHeader, &[u8])> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::message_too_small(
            FRAME_HEADER_SIZE,
            data.len(),
            "frame header",
        ));
    }

    let mut r = WireReader::new(data);
    let magic = r.get_u32("frame magic")?;
    if magic != FRAME_MAGIC {
        return Err(ProtocolError::invalid_magic(FRAME_MAGIC, magic, 0));
    }

    let version = r.get_u8("frame version")?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::unsupported_version(version, PROTOCOL_VERSION));
    }

    let raw_kind = r.get_u8("frame kind")?;
    let kind = FrameKind::try_from(raw_kind)
        .map_err(|_| ProtocolError::UnknownFrameKind { kind: raw_kind })?;
    let source = r.get_node_id("frame source")?;
    let payload_len = r.get_u32("frame payload length")?;
    let checksum = r.get_u32("frame checksum")?;

    let len = payload_len as usize;
    if len > MAX_FRAME_PAYLOAD {
        return Err(ProtocolError::payload_too_large(len, MAX_FRAME_PAYLOAD, "frame payload"));
    }
    if r.remaining() < len {
        return Err(ProtocolError::message_too_small(
            FRAME_HEADER_SIZE + len,
            data.len(),
            "frame payload",
        ));
    }
    if r.remaining() > len {
        return Err(ProtocolError::TrailingBytes {
            remaining: r.remaining() - len,
            context: "frame payload".to_string(),
        });
    }

    let payload = &data[FRAME_HEADER_SIZE..];
    let calculated = crc32fast::hash(payload);
    if calculated != checksum {
        debug!(source = %source.short(), kind = ?kind, expected = checksum, calculated, "frame checksum mismatch");
        return Err(ProtocolError::ChecksumMismatch {
            expected: checksum,
            calculated,
            payload_size: len,
        });
    }

    trace!(source = %source.short(), kind = ?kind, len, "frame decoded");
    Ok((
        FrameHeader {
            kind,
            source,
            payload_len,
            checksum,
        },
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size_matches_layout() {
        let frame = encode_frame(FrameKind::Down, &NodeId::random(), &[]).unwrap();
        assert_eq!(frame.len(), FRAME_HEADER_SIZE);
    }

    #[test]
    fn test_decode_valid_frame() {
        let source = NodeId::random();
        let frame = encode_frame(FrameKind::Deliver, &source, b"payload").unwrap();

        let (header, payload) = decode_frame(&frame).unwrap();
        assert_eq!(header.kind, FrameKind::Deliver);
        assert_eq!(header.source, source);
        assert_eq!(header.payload_len, 7);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let frame = encode_frame(FrameKind::Deliver, &NodeId::random(), b"payload").unwrap();
        let mut corrupted = frame.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        assert!(matches!(
            decode_frame(&corrupted),
            Err(ProtocolError::ChecksumMismatch { payload_size: 7, .. })
        ));
    }

    #[test]
    fn test_wrong_magic_and_version() {
        let frame = encode_frame(FrameKind::Down, &NodeId::random(), &[]).unwrap();

        let mut bad_magic = frame.to_vec();
        bad_magic[0] = 0;
        assert!(matches!(decode_frame(&bad_magic), Err(ProtocolError::InvalidMagic { .. })));

        let mut bad_version = frame.to_vec();
        bad_version[4] = 9;
        assert!(matches!(
            decode_frame(&bad_version),
            Err(ProtocolError::UnsupportedVersion { version: 9, .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let frame = encode_frame(FrameKind::Down, &NodeId::random(), &[]).unwrap();
        let mut bad_kind = frame.to_vec();
        bad_kind[5] = 42;
        assert_eq!(
            decode_frame(&bad_kind),
            Err(ProtocolError::UnknownFrameKind { kind: 42 })
        );
    }

    #[test]
    fn test_truncated_payload() {
        let frame = encode_frame(FrameKind::Deliver, &NodeId::random(), b"abcdef").unwrap();
        let truncated = &frame[..frame.len() - 2];
        assert!(matches!(
            decode_frame(truncated),
            Err(ProtocolError::MessageTooSmall { .. })
        ));
    }
}
