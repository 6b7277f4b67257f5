//! Byte-level writer and reader
//!
//! [`WireWriter`] appends little-endian fields to a growable [`BytesMut`];
//! [`WireReader`] walks a borrowed slice and reports truncation with the
//! offset and the name of the field being read.

use crate::constants::MAX_STRING_LEN;
use crate::error::{ProtocolError, ProtocolResult};
use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use types::{ActorAddr, ActorId, NodeId};

/// Append-only encoder
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn put_node_id(&mut self, node: &NodeId) {
        self.buf.put_slice(node.as_bytes());
    }

    /// Node id followed by the local id
    pub fn put_addr(&mut self, addr: &ActorAddr) {
        self.put_node_id(&addr.node());
        self.put_u64(addr.id().value());
    }

    /// `u32` length prefix followed by the raw bytes
    pub fn put_bytes(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.buf.put_slice(data);
    }

    /// Length-prefixed UTF-8; rejects strings the reader would refuse
    pub fn put_str(&mut self, value: &str, context: &str) -> ProtocolResult<()> {
        if value.len() > MAX_STRING_LEN {
            return Err(ProtocolError::payload_too_large(
                value.len(),
                MAX_STRING_LEN,
                context,
            ));
        }
        self.put_bytes(value.as_bytes());
        Ok(())
    }

    /// Raw bytes without length prefix
    pub fn put_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over an encoded buffer
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize, context: &str) -> ProtocolResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ProtocolError::message_too_small(
                self.offset + len,
                self.data.len(),
                context,
            ));
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn get_u8(&mut self, context: &str) -> ProtocolResult<u8> {
        Ok(self.take(1, context)?[0])
    }

    pub fn get_u32(&mut self, context: &str) -> ProtocolResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4, context)?))
    }

    pub fn get_u64(&mut self, context: &str) -> ProtocolResult<u64> {
        Ok(LittleEndian::read_u64(self.take(8, context)?))
    }

    pub fn get_node_id(&mut self, context: &str) -> ProtocolResult<NodeId> {
        let mut bytes = [0u8; NodeId::SIZE];
        bytes.copy_from_slice(self.take(NodeId::SIZE, context)?);
        Ok(NodeId::from_bytes(bytes))
    }

    /// Reads a node id and a non-zero local id
    pub fn get_addr(&mut self, context: &str) -> ProtocolResult<ActorAddr> {
        let node = self.get_node_id(context)?;
        let offset = self.offset;
        let id = self.get_u64(context)?;
        if id == 0 {
            return Err(ProtocolError::parse_error(
                offset,
                "actor id 0 is reserved",
                context,
            ));
        }
        Ok(ActorAddr::new(node, ActorId::new(id)))
    }

    pub fn get_bytes(&mut self, context: &str) -> ProtocolResult<&'a [u8]> {
        let len = self.get_u32(context)? as usize;
        self.take(len, context)
    }

    pub fn get_str(&mut self, context: &str) -> ProtocolResult<&'a str> {
        let len = self.get_u32(context)? as usize;
        if len > MAX_STRING_LEN {
            return Err(ProtocolError::payload_too_large(len, MAX_STRING_LEN, context));
        }
        let offset = self.offset;
        let raw = self.take(len, context)?;
        std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8 {
            offset,
            context: context.to_string(),
        })
    }

    /// Fails if any bytes are left unread
    pub fn finish(&self, context: &str) -> ProtocolResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes {
                remaining: self.remaining(),
                context: context.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_little_endian() {
        let mut w = WireWriter::new();
        w.put_u32(0x0102_0304);
        w.put_u64(1);
        assert_eq!(&w.as_slice()[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(w.as_slice()[4], 1);
        assert_eq!(w.len(), 12);
    }

    #[test]
    fn test_mixed_fields() {
        let node = NodeId::random();
        let addr = ActorAddr::new(node, ActorId::new(99));

        let mut w = WireWriter::new();
        w.put_u8(7);
        w.put_addr(&addr);
        w.put_str("ping", "tag").unwrap();
        w.put_bytes(&[1, 2, 3]);
        let bytes = w.freeze();

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.get_u8("tag").unwrap(), 7);
        assert_eq!(r.get_addr("addr").unwrap(), addr);
        assert_eq!(r.get_str("name").unwrap(), "ping");
        assert_eq!(r.get_bytes("data").unwrap(), &[1, 2, 3]);
        assert!(r.finish("test").is_ok());
    }

    #[test]
    fn test_truncated_read_reports_context() {
        let mut r = WireReader::new(&[1, 2]);
        let err = r.get_u32("payload length").unwrap_err();
        assert_eq!(err, ProtocolError::message_too_small(4, 2, "payload length"));
        // failed read does not advance
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn test_zero_actor_id_rejected() {
        let mut w = WireWriter::new();
        w.put_node_id(&NodeId::random());
        w.put_u64(0);
        let bytes = w.freeze();

        let err = WireReader::new(&bytes).get_addr("addr").unwrap_err();
        assert!(matches!(err, ProtocolError::ParseError { offset: 16, .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut w = WireWriter::new();
        w.put_bytes(&[0xFF, 0xFE]);
        let bytes = w.freeze();

        let err = WireReader::new(&bytes).get_str("msg_type").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8 { offset: 4, .. }));
    }

    #[test]
    fn test_oversized_string_rejected_on_write() {
        let mut w = WireWriter::new();
        let long = "x".repeat(MAX_STRING_LEN + 1);
        let err = w.put_str(&long, "msg_type").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::payload_too_large(MAX_STRING_LEN + 1, MAX_STRING_LEN, "msg_type")
        );
        // nothing written
        assert!(w.is_empty());

        let at_limit = "x".repeat(MAX_STRING_LEN);
        w.put_str(&at_limit, "msg_type").unwrap();
        let bytes = w.freeze();
        assert_eq!(WireReader::new(&bytes).get_str("msg_type").unwrap().len(), MAX_STRING_LEN);
    }

    #[test]
    fn test_trailing_bytes() {
        let r = WireReader::new(&[0]);
        assert!(matches!(
            r.finish("frame"),
            Err(ProtocolError::TrailingBytes { remaining: 1, .. })
        ));
    }
}
