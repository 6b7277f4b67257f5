//! Logical wire record for actor references
//!
//! ```text
//! discriminator: u8    0 = empty, 1 = strong, 2 = weak
//! node_id:       [u8; 16]   present iff discriminator != 0
//! local_id:      u64        present iff discriminator != 0
//! ```
//!
//! Only the address travels; actor state never does. Turning a record back
//! into a live handle needs the receiving system's registries and is done in
//! the actor runtime.

use crate::buffers::{WireReader, WireWriter};
use crate::error::{ProtocolError, ProtocolResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use types::ActorAddr;

/// Discriminator byte of an actor reference record
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RefKind {
    Empty = 0,
    Strong = 1,
    Weak = 2,
}

/// Decoded actor reference record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRefRecord {
    Empty,
    Strong(ActorAddr),
    Weak(ActorAddr),
}

impl ActorRefRecord {
    pub fn kind(&self) -> RefKind {
        match self {
            ActorRefRecord::Empty => RefKind::Empty,
            ActorRefRecord::Strong(_) => RefKind::Strong,
            ActorRefRecord::Weak(_) => RefKind::Weak,
        }
    }

    pub fn addr(&self) -> Option<ActorAddr> {
        match self {
            ActorRefRecord::Empty => None,
            ActorRefRecord::Strong(addr) | ActorRefRecord::Weak(addr) => Some(*addr),
        }
    }

    pub fn write(&self, w: &mut WireWriter) {
        w.put_u8(self.kind().into());
        if let Some(addr) = self.addr() {
            w.put_addr(&addr);
        }
    }

    pub fn read(r: &mut WireReader<'_>) -> ProtocolResult<Self> {
        let offset = r.offset();
        let raw = r.get_u8("actor reference discriminator")?;
        let kind = RefKind::try_from(raw)
            .map_err(|_| ProtocolError::InvalidRefKind { value: raw, offset })?;

        Ok(match kind {
            RefKind::Empty => ActorRefRecord::Empty,
            RefKind::Strong => ActorRefRecord::Strong(r.get_addr("strong actor reference")?),
            RefKind::Weak => ActorRefRecord::Weak(r.get_addr("weak actor reference")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ACTOR_REF_RECORD_SIZE;
    use types::{ActorId, NodeId};

    fn addr() -> ActorAddr {
        ActorAddr::new(NodeId::random(), ActorId::new(5))
    }

    #[test]
    fn test_empty_record_is_one_byte() {
        let mut w = WireWriter::new();
        ActorRefRecord::Empty.write(&mut w);
        assert_eq!(w.as_slice(), &[0]);
    }

    #[test]
    fn test_strong_and_weak_layout() {
        let a = addr();
        for (record, tag) in [(ActorRefRecord::Strong(a), 1u8), (ActorRefRecord::Weak(a), 2u8)] {
            let mut w = WireWriter::new();
            record.write(&mut w);
            assert_eq!(w.len(), ACTOR_REF_RECORD_SIZE);
            assert_eq!(w.as_slice()[0], tag);
            assert_eq!(&w.as_slice()[1..17], a.node().as_bytes());

            let bytes = w.freeze();
            let mut r = WireReader::new(&bytes);
            assert_eq!(ActorRefRecord::read(&mut r).unwrap(), record);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn test_unknown_discriminator() {
        let mut r = WireReader::new(&[3]);
        assert_eq!(
            ActorRefRecord::read(&mut r),
            Err(ProtocolError::InvalidRefKind { value: 3, offset: 0 })
        );
    }

    #[test]
    fn test_truncated_address() {
        let mut r = WireReader::new(&[1, 0xAA, 0xBB]);
        assert!(matches!(
            ActorRefRecord::read(&mut r),
            Err(ProtocolError::MessageTooSmall { .. })
        ));
    }
}
