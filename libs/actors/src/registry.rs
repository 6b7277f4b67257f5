//! Actor Registry
//!
//! Location-transparent actor discovery:
//!
//! - [`ActorRegistry`] maps local ids to weak handles so that an address read
//!   off the wire resolves to the existing control block
//! - [`ProxyRegistry`] keeps one proxy per remote address alive and remembers
//!   remote actors known to have terminated
//!
//! Locks are held only for map operations. Handles removed from a map are
//! returned to the caller and dropped after the guard is released, so no
//! actor destructor ever runs under a registry lock.

use crate::handle::{StrongActorRef, WeakActorRef};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};
use types::{ActorAddr, ActorId, NodeId};

/// Local actors by id
#[derive(Debug, Default)]
pub struct ActorRegistry {
    local_actors: RwLock<HashMap<ActorId, WeakActorRef>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register local actor
    pub fn register(&self, actor: &StrongActorRef) {
        debug!(actor = %actor.addr(), "Registering local actor");
        let previous = self.local_actors.write().insert(actor.id(), actor.downgrade());
        debug_assert!(previous.is_none(), "actor id {} registered twice", actor.id());
        drop(previous);
    }

    /// Strong handle to a live local actor
    pub fn lookup(&self, id: ActorId) -> Option<StrongActorRef> {
        self.local_actors.read().get(&id).and_then(WeakActorRef::upgrade)
    }

    /// Remove an entry; returns whether one was present
    pub fn erase(&self, id: ActorId) -> bool {
        let removed = self.local_actors.write().remove(&id);
        match removed {
            Some(weak) => {
                trace!(actor = %weak.addr(), "Unregistered local actor");
                drop(weak);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.local_actors.read().contains_key(&id)
    }

    /// List all local actors
    pub fn list_local_actors(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.local_actors.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.local_actors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_actors.read().is_empty()
    }

    /// Remove every entry
    pub(crate) fn clear(&self) {
        let drained: Vec<WeakActorRef> = self.local_actors.write().drain().map(|(_, w)| w).collect();
        drop(drained);
    }
}

/// Default bound on remembered terminated addresses
pub const MAX_TERMINATED_ENTRIES: usize = 16_384;

/// Terminated remote addresses, oldest evicted first
#[derive(Debug)]
struct TerminatedSet {
    members: HashSet<ActorAddr>,
    order: VecDeque<ActorAddr>,
    capacity: usize,
}

impl TerminatedSet {
    fn new(capacity: usize) -> Self {
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, addr: ActorAddr) {
        if !self.members.insert(addr) {
            return;
        }
        self.order.push_back(addr);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
                trace!(actor = %oldest, "Evicted terminated entry");
            }
        }
    }

    fn contains(&self, addr: &ActorAddr) -> bool {
        self.members.contains(addr)
    }

    fn remove_node(&mut self, node: &NodeId) -> usize {
        let before = self.order.len();
        self.order.retain(|addr| !addr.is_hosted_on(node));
        self.members.retain(|addr| !addr.is_hosted_on(node));
        before - self.order.len()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}

#[derive(Debug)]
struct ProxyTable {
    proxies: HashMap<ActorAddr, StrongActorRef>,
    terminated: TerminatedSet,
}

/// Proxies for actors on other nodes
#[derive(Debug)]
pub struct ProxyRegistry {
    table: Mutex<ProxyTable>,
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::with_terminated_capacity(MAX_TERMINATED_ENTRIES)
    }
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry remembering at most `capacity` terminated addresses.
    ///
    /// Once evicted, an address resolves to a proxy again until the next
    /// `Down` notification for it.
    pub fn with_terminated_capacity(capacity: usize) -> Self {
        Self {
            table: Mutex::new(ProxyTable {
                proxies: HashMap::new(),
                terminated: TerminatedSet::new(capacity),
            }),
        }
    }

    /// Existing proxy for `addr`, or a new one from `make`.
    ///
    /// `None` if the remote actor is known to have terminated.
    pub fn get_or_put(
        &self,
        addr: ActorAddr,
        make: impl FnOnce() -> StrongActorRef,
    ) -> Option<StrongActorRef> {
        let mut table = self.table.lock();
        if table.terminated.contains(&addr) {
            trace!(actor = %addr, "Remote actor known terminated");
            return None;
        }
        let proxy = table.proxies.entry(addr).or_insert_with(|| {
            debug!(actor = %addr, "Creating proxy");
            make()
        });
        Some(proxy.clone())
    }

    pub fn get(&self, addr: &ActorAddr) -> Option<StrongActorRef> {
        self.table.lock().proxies.get(addr).cloned()
    }

    /// Record that a remote actor is gone and release its proxy
    pub fn mark_terminated(&self, addr: ActorAddr) -> bool {
        let removed = {
            let mut table = self.table.lock();
            table.terminated.insert(addr);
            table.proxies.remove(&addr)
        };
        debug!(actor = %addr, had_proxy = removed.is_some(), "Remote actor terminated");
        removed.is_some()
    }

    pub fn is_terminated(&self, addr: &ActorAddr) -> bool {
        self.table.lock().terminated.contains(addr)
    }

    /// Number of remembered terminated addresses
    pub fn terminated_len(&self) -> usize {
        self.table.lock().terminated.len()
    }

    /// Release every proxy for `node`, e.g. after losing the connection.
    ///
    /// Terminated entries for the node are forgotten as well.
    pub fn erase_node(&self, node: &NodeId) -> usize {
        let removed: Vec<StrongActorRef> = {
            let mut table = self.table.lock();
            let forgotten = table.terminated.remove_node(node);
            trace!(node = %node, forgotten, "Forgot terminated entries for node");
            let addrs: Vec<ActorAddr> = table
                .proxies
                .keys()
                .filter(|addr| addr.is_hosted_on(node))
                .copied()
                .collect();
            addrs
                .iter()
                .filter_map(|addr| table.proxies.remove(addr))
                .collect()
        };
        debug!(node = %node, count = removed.len(), "Released proxies for node");
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.table.lock().proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().proxies.is_empty()
    }

    pub(crate) fn clear(&self) {
        let drained: Vec<StrongActorRef> = {
            let mut table = self.table.lock();
            table.terminated.clear();
            table.proxies.drain().map(|(_, p)| p).collect()
        };
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ActorSystem;

    #[test]
    fn test_register_lookup_erase() {
        let system = ActorSystem::new("registry");
        let (actor, _mailbox) = system.spawn(());
        let registry = system.registry();

        assert!(registry.contains(actor.id()));
        let found = registry.lookup(actor.id()).unwrap();
        assert!(StrongActorRef::ptr_eq(&found, &actor));
        assert_eq!(registry.list_local_actors(), vec![actor.id()]);

        assert!(registry.erase(actor.id()));
        assert!(!registry.erase(actor.id()));
        assert!(registry.lookup(actor.id()).is_none());
    }

    #[test]
    fn test_dead_actor_is_unregistered() {
        let system = ActorSystem::new("registry");
        let (actor, _mailbox) = system.spawn(());
        let id = actor.id();

        drop(actor);
        assert!(!system.registry().contains(id));
        assert!(system.registry().lookup(id).is_none());
        assert!(system.registry().is_empty());
    }

    #[test]
    fn test_proxy_reuse_and_termination() {
        let system = ActorSystem::new("registry");
        let remote = ActorAddr::new(NodeId::random(), ActorId::new(42));
        let proxies = system.proxies();

        let first = system.proxy_for(remote).unwrap();
        let second = system.proxy_for(remote).unwrap();
        assert!(StrongActorRef::ptr_eq(&first, &second));
        assert_eq!(proxies.len(), 1);

        let weak = first.downgrade();
        drop((first, second));
        // registry keeps the proxy alive
        assert!(weak.is_alive());

        assert!(proxies.mark_terminated(remote));
        assert!(!weak.is_alive());
        assert!(proxies.is_terminated(&remote));
        assert!(system.proxy_for(remote).is_none());
    }

    #[test]
    fn test_erase_node_releases_only_that_node() {
        let system = ActorSystem::new("registry");
        let lost = NodeId::random();
        let kept = NodeId::random();

        for id in 1..=3 {
            system.proxy_for(ActorAddr::new(lost, ActorId::new(id)));
        }
        system.proxy_for(ActorAddr::new(kept, ActorId::new(1)));

        assert_eq!(system.proxies().erase_node(&lost), 3);
        assert_eq!(system.proxies().len(), 1);
        assert!(system.proxies().get(&ActorAddr::new(kept, ActorId::new(1))).is_some());
        // erased, not terminated: a fresh proxy can be created
        assert!(system.proxy_for(ActorAddr::new(lost, ActorId::new(1))).is_some());
    }

    #[test]
    fn test_erase_node_forgets_terminated_entries() {
        let proxies = ProxyRegistry::new();
        let lost = NodeId::random();
        let kept = NodeId::random();

        for id in 1..=10_000 {
            proxies.mark_terminated(ActorAddr::new(lost, ActorId::new(id)));
        }
        proxies.mark_terminated(ActorAddr::new(kept, ActorId::new(1)));
        assert_eq!(proxies.terminated_len(), 10_001);

        proxies.erase_node(&lost);
        assert_eq!(proxies.terminated_len(), 1);
        assert!(!proxies.is_terminated(&ActorAddr::new(lost, ActorId::new(1))));
        assert!(proxies.is_terminated(&ActorAddr::new(kept, ActorId::new(1))));
    }

    #[test]
    fn test_terminated_entries_are_bounded() {
        let proxies = ProxyRegistry::with_terminated_capacity(4);
        let node = NodeId::random();
        let addr = |id| ActorAddr::new(node, ActorId::new(id));

        for id in 1..=6 {
            proxies.mark_terminated(addr(id));
        }
        // repeated notifications do not take extra room
        proxies.mark_terminated(addr(6));

        assert_eq!(proxies.terminated_len(), 4);
        assert!(!proxies.is_terminated(&addr(1)));
        assert!(!proxies.is_terminated(&addr(2)));
        assert!((3..=6).all(|id| proxies.is_terminated(&addr(id))));
    }
}
