//! Actor Transport Abstraction
//!
//! The runtime only needs one thing from the network: push a frame towards a
//! node. Framing lives here, connection handling lives behind [`Transport`].
//!
//! ```text
//! proxy.enqueue ──► encode_deliver ──► Transport::send_frame ──► remote node
//!                                                                   │
//! proxies.mark_terminated ◄── handle_frame(Down) ◄── encode_down ◄──┘ (dead recipient)
//! ```
//!
//! Payloads:
//!
//! ```text
//! Deliver  dest_id: u64 | sender: ref record | mid: u64 | msg_type: str | data: bytes
//! Down     addr: node [u8; 16] + id u64
//! ```
//!
//! [`LoopbackNetwork`] connects several systems in one process. Frames queue
//! up until [`LoopbackNetwork::pump`] is called, so tests decide exactly when
//! the "network" makes progress.

use crate::error::{ActorError, Result};
use crate::messages::MailboxElement;
use crate::serialization::write_element;
use crate::system::{ActorSystem, SystemShared};
use bytes::Bytes;
use codec::{encode_frame, FrameKind, ProtocolResult, WireWriter};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};
use types::{ActorAddr, ActorId, NodeId};

/// Outbound frame sink
pub trait Transport: Send + Sync + 'static {
    /// Queue `frame` for delivery to `to`; must not block
    fn send_frame(&self, to: &NodeId, frame: Bytes) -> Result<()>;
}

/// Frame carrying one mailbox element for `dest` on the receiving node
pub(crate) fn encode_deliver(
    source: &NodeId,
    dest: ActorId,
    element: &MailboxElement,
) -> ProtocolResult<Bytes> {
    let mut w = WireWriter::with_capacity(64 + element.content.len());
    w.put_u64(dest.value());
    write_element(&mut w, element)?;
    encode_frame(FrameKind::Deliver, source, w.as_slice())
}

/// Frame announcing that `addr` (hosted on `source`) is gone
pub(crate) fn encode_down(source: &NodeId, addr: ActorAddr) -> ProtocolResult<Bytes> {
    let mut w = WireWriter::with_capacity(24);
    w.put_addr(&addr);
    encode_frame(FrameKind::Down, source, w.as_slice())
}

/// Upper bound on pump rounds in [`LoopbackNetwork::pump_all`]
const MAX_PUMP_ROUNDS: usize = 1_000;

#[derive(Default)]
struct LoopbackInner {
    nodes: RwLock<HashMap<NodeId, Weak<SystemShared>>>,
    queue: Mutex<VecDeque<(NodeId, Bytes)>>,
}

/// In-process network connecting several actor systems
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    inner: Arc<LoopbackInner>,
}

/// The [`Transport`] handed to each attached system
struct LoopbackEndpoint {
    local: NodeId,
    inner: Arc<LoopbackInner>,
}

impl Transport for LoopbackEndpoint {
    fn send_frame(&self, to: &NodeId, frame: Bytes) -> Result<()> {
        if !self.inner.nodes.read().contains_key(to) {
            return Err(ActorError::unreachable(*to, "not attached to loopback network"));
        }
        trace!(from = %self.local.short(), to = %to.short(), len = frame.len(), "loopback frame queued");
        self.inner.queue.lock().push_back((*to, frame));
        Ok(())
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `system` and make this network its transport
    pub fn attach(&self, system: &ActorSystem) {
        let node = system.node();
        self.inner.nodes.write().insert(node, system.downgrade());
        system.set_transport(Arc::new(LoopbackEndpoint {
            local: node,
            inner: self.inner.clone(),
        }));
        debug!(node = %node, name = system.name(), "Attached to loopback network");
    }

    /// Disconnect a node; frames already queued for it are discarded on pump
    pub fn detach(&self, node: &NodeId) -> bool {
        let removed = self.inner.nodes.write().remove(node).is_some();
        if removed {
            debug!(node = %node, "Detached from loopback network");
        }
        removed
    }

    /// Frames waiting to be delivered
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Deliver the frames queued so far; returns how many were handed to a node.
    ///
    /// Frames produced while delivering stay queued for the next call.
    pub fn pump(&self) -> usize {
        let batch: Vec<(NodeId, Bytes)> = self.inner.queue.lock().drain(..).collect();
        let mut delivered = 0;

        for (to, frame) in batch {
            let target = self.inner.nodes.read().get(&to).and_then(Weak::upgrade);
            let Some(shared) = target else {
                debug!(node = %to, "dropping frame for detached node");
                continue;
            };

            let system = ActorSystem::from_shared(shared);
            if let Err(e) = system.handle_frame(&frame) {
                warn!(node = %to, error = %e, "inbound frame rejected");
            }
            delivered += 1;
        }

        delivered
    }

    /// Pump until no frames are left; returns the total delivered
    pub fn pump_all(&self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            if self.pending() == 0 {
                break;
            }
            total += self.pump();
        }
        total
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("nodes", &self.inner.nodes.read().len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use codec::{decode_frame, WireReader};

    #[test]
    fn test_deliver_frame_layout() {
        let source = NodeId::random();
        let element = MailboxElement::anonymous(Message::new("ping", vec![7u8; 3]));
        let frame = encode_deliver(&source, ActorId::new(12), &element).unwrap();

        let (header, payload) = decode_frame(&frame).unwrap();
        assert_eq!(header.kind, FrameKind::Deliver);
        assert_eq!(header.source, source);

        let mut r = WireReader::new(payload);
        assert_eq!(r.get_u64("dest").unwrap(), 12);
        // empty sender record
        assert_eq!(r.get_u8("sender").unwrap(), 0);
        assert_eq!(r.get_u64("mid").unwrap(), 0);
        assert_eq!(r.get_str("type").unwrap(), "ping");
        assert_eq!(r.get_bytes("data").unwrap(), &[7, 7, 7]);
        r.finish("deliver").unwrap();
    }

    #[test]
    fn test_down_frame_layout() {
        let source = NodeId::random();
        let addr = ActorAddr::new(source, ActorId::new(3));
        let frame = encode_down(&source, addr).unwrap();

        let (header, payload) = decode_frame(&frame).unwrap();
        assert_eq!(header.kind, FrameKind::Down);
        let mut r = WireReader::new(payload);
        assert_eq!(r.get_addr("down").unwrap(), addr);
    }

    #[test]
    fn test_send_to_unknown_node_fails() {
        let network = LoopbackNetwork::new();
        let system = ActorSystem::new("alpha");
        network.attach(&system);

        let transport = system.transport().unwrap();
        let err = transport.send_frame(&NodeId::random(), Bytes::from_static(b"x")).unwrap_err();
        assert!(matches!(err, ActorError::UnreachableNode { .. }));
        assert_eq!(network.pending(), 0);
    }

    #[test]
    fn test_frames_for_detached_node_are_dropped() {
        let network = LoopbackNetwork::new();
        let alpha = ActorSystem::new("alpha");
        let beta = ActorSystem::new("beta");
        network.attach(&alpha);
        network.attach(&beta);

        let transport = alpha.transport().unwrap();
        transport.send_frame(&beta.node(), Bytes::from_static(b"junk")).unwrap();
        assert!(network.detach(&beta.node()));
        assert_eq!(network.pump(), 0);
        assert_eq!(network.pending(), 0);
    }
}
