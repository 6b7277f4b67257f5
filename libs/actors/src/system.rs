//! Actor System Core
//!
//! The hosting side of every control block: id allocation, the local
//! registry, proxies for remote actors, dead-letter handling and inbound
//! frame processing. Control blocks point back here through a
//! `std::sync::Weak`, so a running actor never keeps its system alive.
//!
//! # Lock Ordering
//!
//! The registry map, the proxy table and the transport slot are never held
//! together, and no handle is dropped while any of them is held. Dropping a
//! handle can run an actor destructor, which erases the actor from the
//! registry.

use crate::actor::{AbstractActor, LocalActor};
use crate::control_block::ControlBlock;
use crate::error::{ActorError, Result};
use crate::handle::StrongActorRef;
use crate::mailbox::{ChannelMailbox, Mailbox, MailboxReceiver};
use crate::messages::MailboxElement;
use crate::proxy::ActorProxy;
use crate::registry::{ActorRegistry, ProxyRegistry};
use crate::serialization::read_element;
use crate::transport::{encode_down, Transport};
use codec::{decode_frame, FrameKind, ProtocolError, WireReader};
use parking_lot::RwLock;
use runtime_config::{DeadLetterPolicy, DeliverySettings, RuntimeConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use types::{ActorAddr, ActorId, NodeId};

/// Element that could not be delivered
#[derive(Debug)]
pub struct DeadLetter {
    pub recipient: ActorAddr,
    pub element: MailboxElement,
}

/// Where forwarded dead letters go
enum DeadLetterSink {
    /// Nobody asked for dead letters yet; they are dropped
    Untaken,
    Open(mpsc::UnboundedSender<DeadLetter>),
    /// Receiver handed out and the system shut down since
    Closed,
}

/// System-wide counters
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub actors_spawned: AtomicU64,
    pub proxies_created: AtomicU64,
    pub data_destroyed: AtomicU64,
    pub blocks_released: AtomicU64,
    pub dead_letters: AtomicU64,
    pub frames_sent: AtomicU64,
    pub frames_received: AtomicU64,
    pub frames_rejected: AtomicU64,
}

/// Point-in-time copy of [`SystemMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub actors_spawned: u64,
    pub proxies_created: u64,
    pub data_destroyed: u64,
    pub blocks_released: u64,
    pub dead_letters: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_rejected: u64,
}

impl SystemMetrics {
    pub fn record_block_released(&self) {
        self.blocks_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            proxies_created: self.proxies_created.load(Ordering::Relaxed),
            data_destroyed: self.data_destroyed.load(Ordering::Relaxed),
            blocks_released: self.blocks_released.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
        }
    }
}

/// State shared by all clones of an [`ActorSystem`]
pub(crate) struct SystemShared {
    pub(crate) node: NodeId,
    name: String,
    next_id: AtomicU64,
    registry: ActorRegistry,
    proxies: ProxyRegistry,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    delivery: DeliverySettings,
    dead_letters: RwLock<DeadLetterSink>,
    pub(crate) metrics: SystemMetrics,
}

impl SystemShared {
    pub(crate) fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.read().clone()
    }

    /// Apply the dead-letter policy to an undeliverable element
    pub(crate) fn dead_letter(&self, recipient: ActorAddr, element: MailboxElement) {
        self.metrics.dead_letters.fetch_add(1, Ordering::Relaxed);
        match self.delivery.dead_letter_policy {
            DeadLetterPolicy::Drop => {
                debug!(
                    actor = %recipient,
                    msg_type = element.content.msg_type(),
                    "Dropping dead letter"
                );
            }
            DeadLetterPolicy::Forward => {
                let tx = match &*self.dead_letters.read() {
                    DeadLetterSink::Open(tx) => Some(tx.clone()),
                    DeadLetterSink::Untaken | DeadLetterSink::Closed => None,
                };
                // letters hold sender handles; never queue them where nobody reads
                let Some(tx) = tx else {
                    debug!(actor = %recipient, "No dead-letter receiver, dropping");
                    return;
                };
                trace!(actor = %recipient, "Forwarding dead letter");
                if let Err(mpsc::error::SendError(letter)) =
                    tx.send(DeadLetter { recipient, element })
                {
                    debug!(actor = %letter.recipient, "Dead-letter channel closed, dropping");
                }
            }
        }
    }

    /// Called once per control block, right after its data was destroyed
    pub(crate) fn on_data_destroyed(&self, addr: ActorAddr) {
        self.metrics.data_destroyed.fetch_add(1, Ordering::Relaxed);
        if addr.is_hosted_on(&self.node) {
            self.registry.erase(addr.id());
        }
    }
}

/// Handle to a running actor system; cheap to clone
#[derive(Clone)]
pub struct ActorSystem {
    shared: Arc<SystemShared>,
}

/// Builder for [`ActorSystem`]
#[derive(Default)]
pub struct ActorSystemBuilder {
    name: Option<String>,
    node: Option<NodeId>,
    delivery: DeliverySettings,
    transport: Option<Arc<dyn Transport>>,
}

impl ActorSystemBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fixed node id instead of a random one
    pub fn node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn delivery(mut self, delivery: DeliverySettings) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn dead_letter_policy(mut self, policy: DeadLetterPolicy) -> Self {
        self.delivery.dead_letter_policy = policy;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ActorSystem {
        let node = self.node.unwrap_or_else(NodeId::random);
        let name = self.name.unwrap_or_else(|| format!("node-{}", node.short()));
        info!(
            node = %node,
            name = %name,
            dead_letter_policy = ?self.delivery.dead_letter_policy,
            "Creating actor system"
        );

        ActorSystem {
            shared: Arc::new(SystemShared {
                node,
                name,
                next_id: AtomicU64::new(1),
                registry: ActorRegistry::new(),
                proxies: ProxyRegistry::new(),
                transport: RwLock::new(self.transport),
                delivery: self.delivery,
                dead_letters: RwLock::new(DeadLetterSink::Untaken),
                metrics: SystemMetrics::default(),
            }),
        }
    }
}

impl ActorSystem {
    /// System with a random node id and default delivery settings
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    pub fn builder() -> ActorSystemBuilder {
        ActorSystemBuilder::default()
    }

    /// Build a system from loaded runtime configuration
    pub fn from_config(config: &RuntimeConfig, transport: Option<Arc<dyn Transport>>) -> Result<Self> {
        let mut builder = Self::builder()
            .name(config.node.name.clone())
            .delivery(config.delivery.clone());

        let node = config
            .node
            .node_id()
            .map_err(|e| ActorError::configuration(format!("{:#}", e), Some("node.id")))?;
        if let Some(node) = node {
            builder = builder.node(node);
        }
        if let Some(transport) = transport {
            builder = builder.transport(transport);
        }
        Ok(builder.build())
    }

    pub(crate) fn from_shared(shared: Arc<SystemShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<SystemShared> {
        Arc::downgrade(&self.shared)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn node(&self) -> NodeId {
        self.shared.node
    }

    /// Next unused local id; ids start at 1 and are never reused
    pub fn next_actor_id(&self) -> ActorId {
        ActorId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.shared.registry
    }

    pub fn proxies(&self) -> &ProxyRegistry {
        &self.shared.proxies
    }

    pub fn delivery(&self) -> &DeliverySettings {
        &self.shared.delivery
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        let previous = self.shared.transport.write().replace(transport);
        drop(previous);
    }

    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.shared.transport()
    }

    /// Receiver for forwarded dead letters; `None` after the first call.
    ///
    /// Under [`DeadLetterPolicy::Forward`], letters produced before this is
    /// called are dropped rather than buffered.
    pub fn take_dead_letters(&self) -> Option<mpsc::UnboundedReceiver<DeadLetter>> {
        let mut sink = self.shared.dead_letters.write();
        if !matches!(*sink, DeadLetterSink::Untaken) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *sink = DeadLetterSink::Open(tx);
        Some(rx)
    }

    /// Allocate and register a local actor around arbitrary data
    pub fn spawn_actor<T: AbstractActor>(&self, data: T) -> StrongActorRef {
        let addr = ActorAddr::new(self.node(), self.next_actor_id());
        let actor = ControlBlock::allocate(addr, self.downgrade(), data);
        self.shared.registry.register(&actor);
        self.shared.metrics.actors_spawned.fetch_add(1, Ordering::Relaxed);
        debug!(actor = %addr, "Spawned actor");
        actor
    }

    /// Spawn a local actor with a custom mailbox
    pub fn spawn_with_mailbox<S>(&self, state: S, mailbox: Box<dyn Mailbox>) -> StrongActorRef
    where
        S: Send + Sync + 'static,
    {
        self.spawn_actor(LocalActor::new(mailbox, state))
    }

    /// Spawn a local actor with the default channel mailbox
    pub fn spawn<S>(&self, state: S) -> (StrongActorRef, MailboxReceiver)
    where
        S: Send + Sync + 'static,
    {
        let (mailbox, receiver) = ChannelMailbox::new(self.shared.delivery.mailbox_warn_threshold);
        (self.spawn_with_mailbox(state, Box::new(mailbox)), receiver)
    }

    /// Resolve an address to a handle: the registered actor for local
    /// addresses, a proxy for remote ones
    pub fn resolve(&self, addr: ActorAddr) -> Option<StrongActorRef> {
        if addr.is_hosted_on(&self.shared.node) {
            self.shared.registry.lookup(addr.id())
        } else {
            self.proxy_for(addr)
        }
    }

    /// Proxy for a remote address, created on first use
    pub fn proxy_for(&self, addr: ActorAddr) -> Option<StrongActorRef> {
        debug_assert!(!addr.is_hosted_on(&self.shared.node), "proxy requested for local actor {}", addr);
        self.shared.proxies.get_or_put(addr, || {
            self.shared.metrics.proxies_created.fetch_add(1, Ordering::Relaxed);
            ControlBlock::allocate(addr, self.downgrade(), ActorProxy::new())
        })
    }

    /// Forget all proxies for a node that went away
    pub fn node_down(&self, node: &NodeId) -> usize {
        info!(node = %node, "Remote node down");
        self.shared.proxies.erase_node(node)
    }

    /// Process one inbound frame
    pub fn handle_frame(&self, frame: &[u8]) -> Result<()> {
        let result = self.process_frame(frame);
        if result.is_err() {
            self.shared.metrics.frames_rejected.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn process_frame(&self, frame: &[u8]) -> Result<()> {
        let (header, payload) = decode_frame(frame)?;
        self.shared.metrics.frames_received.fetch_add(1, Ordering::Relaxed);
        let mut r = WireReader::new(payload);

        match header.kind {
            FrameKind::Deliver => {
                let offset = r.offset();
                let dest = ActorId::new(r.get_u64("deliver destination")?);
                if !dest.is_valid() {
                    return Err(ProtocolError::parse_error(offset, "actor id 0 is reserved", "deliver destination").into());
                }
                let element = read_element(self, &mut r)?;
                r.finish("deliver frame")?;
                self.deliver_local(header.source, dest, element);
            }
            FrameKind::Down => {
                let addr = r.get_addr("down notification")?;
                r.finish("down frame")?;
                if addr.is_hosted_on(&header.source) {
                    self.shared.proxies.mark_terminated(addr);
                } else {
                    warn!(actor = %addr, source = %header.source, "Ignoring down notification for foreign actor");
                }
            }
        }
        Ok(())
    }

    fn deliver_local(&self, source: NodeId, dest: ActorId, element: MailboxElement) {
        match self.shared.registry.lookup(dest) {
            Some(actor) => actor.enqueue_element(element, None),
            None => {
                let addr = ActorAddr::new(self.node(), dest);
                self.shared.dead_letter(addr, element);
                self.send_down(source, addr);
            }
        }
    }

    fn send_down(&self, to: NodeId, addr: ActorAddr) {
        let Some(transport) = self.transport() else {
            return;
        };
        let sent = encode_down(&self.shared.node, addr)
            .map_err(ActorError::from)
            .and_then(|frame| transport.send_frame(&to, frame));
        match sent {
            Ok(()) => {
                self.shared.metrics.record_frame_sent();
                debug!(actor = %addr, to = %to, "Sent down notification");
            }
            Err(e) => debug!(actor = %addr, to = %to, error = %e, "Could not send down notification"),
        }
    }

    /// Release registry and proxy entries and detach the transport
    pub fn shutdown(&self) {
        info!(node = %self.node(), name = self.name(), "Shutting down actor system");
        self.shared.registry.clear();
        self.shared.proxies.clear();
        let transport = self.shared.transport.write().take();
        drop(transport);
        let sink = std::mem::replace(&mut *self.shared.dead_letters.write(), DeadLetterSink::Closed);
        drop(sink);
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.shared.name)
            .field("node", &self.shared.node)
            .field("actors", &self.shared.registry.len())
            .field("proxies", &self.shared.proxies.len())
            .finish()
    }
}
