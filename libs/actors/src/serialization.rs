//! Actor handles on the wire
//!
//! Only the address is written. Reading resolves the address against the
//! receiving system:
//!
//! ```text
//! record ──► empty ─────────────────────────────► None
//!        └─► local node ──► registry lookup ─────► same control block / None
//!        └─► remote node ─► known terminated? ───► None
//!                          └► proxy registry ────► proxy (created or reused)
//! ```
//!
//! The discriminator says which kind of handle was written, not which kind
//! the reader wants; a strong record read as weak (or the reverse) resolves
//! to the requested kind.

use crate::handle::{StrongActorRef, WeakActorRef};
use crate::messages::{MailboxElement, Message};
use crate::system::ActorSystem;
use bytes::Bytes;
use codec::{ActorRefRecord, ProtocolResult, RefKind, WireReader, WireWriter};
use tracing::trace;
use types::MessageId;

/// Write a strong handle (or an empty record)
pub fn write_strong(w: &mut WireWriter, handle: Option<&StrongActorRef>) {
    match handle {
        Some(handle) => ActorRefRecord::Strong(handle.addr()),
        None => ActorRefRecord::Empty,
    }
    .write(w);
}

/// Write a weak handle (or an empty record)
pub fn write_weak(w: &mut WireWriter, handle: Option<&WeakActorRef>) {
    match handle {
        Some(handle) => ActorRefRecord::Weak(handle.addr()),
        None => ActorRefRecord::Empty,
    }
    .write(w);
}

/// Read a record and resolve it to a strong handle.
///
/// A remote address resolves to a proxy unless its node has reported the
/// actor gone. An actor that died without such a report still yields a
/// proxy; the first message sent through it triggers the report.
pub fn read_strong(system: &ActorSystem, r: &mut WireReader<'_>) -> ProtocolResult<Option<StrongActorRef>> {
    let record = ActorRefRecord::read(r)?;
    if record.kind() == RefKind::Weak {
        trace!("weak record read as strong handle");
    }
    Ok(record.addr().and_then(|addr| system.resolve(addr)))
}

/// Read a record and resolve it to a weak handle
pub fn read_weak(system: &ActorSystem, r: &mut WireReader<'_>) -> ProtocolResult<Option<WeakActorRef>> {
    let record = ActorRefRecord::read(r)?;
    if record.kind() == RefKind::Strong {
        trace!("strong record read as weak handle");
    }
    Ok(record
        .addr()
        .and_then(|addr| system.resolve(addr))
        .map(|strong| strong.downgrade()))
}

/// Standalone encoding of one strong handle
pub fn encode_strong(handle: Option<&StrongActorRef>) -> Bytes {
    let mut w = WireWriter::new();
    write_strong(&mut w, handle);
    w.freeze()
}

/// Standalone encoding of one weak handle
pub fn encode_weak(handle: Option<&WeakActorRef>) -> Bytes {
    let mut w = WireWriter::new();
    write_weak(&mut w, handle);
    w.freeze()
}

/// Decode a buffer holding exactly one record as a strong handle
pub fn decode_strong(system: &ActorSystem, data: &[u8]) -> ProtocolResult<Option<StrongActorRef>> {
    let mut r = WireReader::new(data);
    let handle = read_strong(system, &mut r)?;
    r.finish("actor reference")?;
    Ok(handle)
}

/// Decode a buffer holding exactly one record as a weak handle
pub fn decode_weak(system: &ActorSystem, data: &[u8]) -> ProtocolResult<Option<WeakActorRef>> {
    let mut r = WireReader::new(data);
    let handle = read_weak(system, &mut r)?;
    r.finish("actor reference")?;
    Ok(handle)
}

/// `sender | mid | msg_type | data`
pub(crate) fn write_element(w: &mut WireWriter, element: &MailboxElement) -> ProtocolResult<()> {
    write_strong(w, element.sender.as_ref());
    w.put_u64(element.mid.raw());
    w.put_str(element.content.msg_type(), "message type")?;
    w.put_bytes(element.content.data());
    Ok(())
}

pub(crate) fn read_element(system: &ActorSystem, r: &mut WireReader<'_>) -> ProtocolResult<MailboxElement> {
    let sender = read_strong(system, r)?;
    let mid = MessageId::from_raw(r.get_u64("message id")?);
    let msg_type = r.get_str("message type")?.to_string();
    let data = Bytes::copy_from_slice(r.get_bytes("message data")?);
    Ok(MailboxElement::new(sender, mid, Message::new(msg_type, data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::ProtocolError;
    use types::{ActorAddr, ActorId, NodeId};

    #[test]
    fn test_same_node_roundtrip_preserves_identity() {
        let system = ActorSystem::new("local");
        let (actor, _mailbox) = system.spawn(());

        let bytes = encode_strong(Some(&actor));
        let decoded = decode_strong(&system, &bytes).unwrap().unwrap();
        assert!(StrongActorRef::ptr_eq(&decoded, &actor));
        assert!(!decoded.is_proxy());
        assert_eq!(system.proxies().len(), 0);

        let weak = decode_weak(&system, &encode_weak(Some(&actor.downgrade()))).unwrap().unwrap();
        assert!(StrongActorRef::ptr_eq(&weak.upgrade().unwrap(), &actor));
    }

    #[test]
    fn test_empty_roundtrip() {
        let system = ActorSystem::new("local");
        assert!(decode_strong(&system, &encode_strong(None)).unwrap().is_none());
        assert!(decode_weak(&system, &encode_weak(None)).unwrap().is_none());
        assert_eq!(encode_strong(None).len(), 1);
    }

    #[test]
    fn test_dead_local_actor_decodes_empty() {
        let system = ActorSystem::new("local");
        let (actor, _mailbox) = system.spawn(());
        let bytes = encode_strong(Some(&actor));
        drop(actor);

        assert!(decode_strong(&system, &bytes).unwrap().is_none());
        assert!(decode_weak(&system, &bytes).unwrap().is_none());
    }

    #[test]
    fn test_unknown_local_id_decodes_empty() {
        let system = ActorSystem::new("local");
        let addr = ActorAddr::new(system.node(), ActorId::new(999));
        let bytes = {
            let mut w = WireWriter::new();
            ActorRefRecord::Strong(addr).write(&mut w);
            w.freeze()
        };
        assert!(decode_strong(&system, &bytes).unwrap().is_none());
    }

    #[test]
    fn test_mismatched_kind_resolves_to_requested() {
        let system = ActorSystem::new("local");
        let (actor, _mailbox) = system.spawn(());

        let weak_bytes = encode_weak(Some(&actor.downgrade()));
        let strong = decode_strong(&system, &weak_bytes).unwrap().unwrap();
        assert!(StrongActorRef::ptr_eq(&strong, &actor));

        let strong_bytes = encode_strong(Some(&actor));
        let weak = decode_weak(&system, &strong_bytes).unwrap().unwrap();
        assert_eq!(weak.addr(), actor.addr());
    }

    #[test]
    fn test_remote_address_yields_proxy() {
        let system = ActorSystem::new("local");
        let remote = ActorAddr::new(NodeId::random(), ActorId::new(3));
        let bytes = {
            let mut w = WireWriter::new();
            ActorRefRecord::Strong(remote).write(&mut w);
            w.freeze()
        };

        let proxy = decode_strong(&system, &bytes).unwrap().unwrap();
        assert!(proxy.is_proxy());
        assert_eq!(proxy.addr(), remote);

        let again = decode_strong(&system, &bytes).unwrap().unwrap();
        assert!(StrongActorRef::ptr_eq(&proxy, &again));

        system.proxies().mark_terminated(remote);
        assert!(decode_strong(&system, &bytes).unwrap().is_none());
    }

    #[test]
    fn test_invalid_discriminator() {
        let system = ActorSystem::new("local");
        let err = decode_strong(&system, &[9]).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidRefKind { value: 9, offset: 0 });
    }

    #[test]
    fn test_truncated_record() {
        let system = ActorSystem::new("local");
        let (actor, _mailbox) = system.spawn(());
        let bytes = encode_strong(Some(&actor));

        let err = decode_strong(&system, &bytes[..10]).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooSmall { .. }));
    }

    #[test]
    fn test_element_roundtrip_keeps_sender() {
        let system = ActorSystem::new("local");
        let (sender, _mailbox) = system.spawn(());
        let element = MailboxElement::new(
            Some(sender.clone()),
            MessageId::request(4),
            Message::new("quote", b"42".to_vec()),
        );

        let mut w = WireWriter::new();
        write_element(&mut w, &element).unwrap();
        let bytes = w.freeze();

        let mut r = WireReader::new(&bytes);
        let decoded = read_element(&system, &mut r).unwrap();
        r.finish("element").unwrap();

        assert!(StrongActorRef::ptr_eq(decoded.sender.as_ref().unwrap(), &sender));
        assert_eq!(decoded.mid, element.mid);
        assert_eq!(decoded.content, element.content);
    }
}
