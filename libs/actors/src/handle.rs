//! Strong and weak actor handles
//!
//! Thin pointer-sized wrappers around a [`ControlBlock`]. Cloning a handle
//! bumps the matching counter, dropping it releases one. An empty handle is
//! spelled `Option<StrongActorRef>` / `Option<WeakActorRef>`.

use crate::actor::AbstractActor;
use crate::control_block::ControlBlock;
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::ptr::NonNull;
use types::{ActorAddr, ActorId, NodeId};

/// Owning reference: keeps the actor's data alive
pub struct StrongActorRef {
    ptr: NonNull<ControlBlock>,
}

/// Observing reference: keeps only the control block alive
pub struct WeakActorRef {
    ptr: NonNull<ControlBlock>,
}

// SAFETY: the control block only exposes atomics, immutable fields and
// `AbstractActor` data, which is required to be `Send + Sync`.
unsafe impl Send for StrongActorRef {}
unsafe impl Sync for StrongActorRef {}
unsafe impl Send for WeakActorRef {}
unsafe impl Sync for WeakActorRef {}

impl StrongActorRef {
    /// Wrap a pointer, adopting one strong count owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live control block and the caller must transfer
    /// ownership of exactly one strong count.
    pub(crate) unsafe fn from_raw(ptr: NonNull<ControlBlock>) -> Self {
        Self { ptr }
    }

    fn block(&self) -> &ControlBlock {
        // SAFETY: we own a strong count, hence also the implicit weak count.
        unsafe { self.ptr.as_ref() }
    }

    pub fn addr(&self) -> ActorAddr {
        self.block().addr()
    }

    pub fn id(&self) -> ActorId {
        self.block().id()
    }

    pub fn node(&self) -> NodeId {
        self.block().node()
    }

    /// Create a weak handle to the same actor
    pub fn downgrade(&self) -> WeakActorRef {
        self.block().add_weak();
        WeakActorRef { ptr: self.ptr }
    }

    /// The actor's private data
    pub fn get(&self) -> &dyn AbstractActor {
        self.block().get()
    }

    /// The actor's private data if it is of type `T`
    pub fn downcast_ref<T: AbstractActor>(&self) -> Option<&T> {
        if self.block().data_type_id() != TypeId::of::<T>() {
            return None;
        }
        let data: *const dyn AbstractActor = self.get();
        // SAFETY: the stored TypeId matches `T`.
        Some(unsafe { &*data.cast::<T>() })
    }

    /// True if this handle points at a stand-in for a remote actor
    pub fn is_proxy(&self) -> bool {
        self.get().is_proxy()
    }

    pub fn strong_count(&self) -> usize {
        self.block().strong_count()
    }

    pub fn weak_count(&self) -> usize {
        self.block().weak_count()
    }

    /// Identity comparison: true if both handles share one control block
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.ptr == b.ptr
    }
}

impl Deref for StrongActorRef {
    type Target = ControlBlock;

    fn deref(&self) -> &ControlBlock {
        self.block()
    }
}

impl Clone for StrongActorRef {
    fn clone(&self) -> Self {
        self.block().add_strong();
        Self { ptr: self.ptr }
    }
}

impl Drop for StrongActorRef {
    fn drop(&mut self) {
        // SAFETY: this handle owns exactly one strong count.
        unsafe { ControlBlock::release_strong(self.ptr) };
    }
}

impl WeakActorRef {
    fn block(&self) -> &ControlBlock {
        // SAFETY: we own a weak count, so the storage is alive. Only the
        // counters and immutable header fields are read through this.
        unsafe { self.ptr.as_ref() }
    }

    pub fn addr(&self) -> ActorAddr {
        self.block().addr()
    }

    pub fn id(&self) -> ActorId {
        self.block().id()
    }

    pub fn node(&self) -> NodeId {
        self.block().node()
    }

    /// Try to obtain a strong handle; `None` once the actor's data is gone
    pub fn upgrade(&self) -> Option<StrongActorRef> {
        if self.block().upgrade_weak() {
            Some(StrongActorRef { ptr: self.ptr })
        } else {
            None
        }
    }

    /// Snapshot liveness query; may be stale by the time it returns
    pub fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }

    pub fn strong_count(&self) -> usize {
        self.block().strong_count()
    }

    pub fn weak_count(&self) -> usize {
        self.block().weak_count()
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.ptr == b.ptr
    }
}

impl Clone for WeakActorRef {
    fn clone(&self) -> Self {
        self.block().add_weak();
        Self { ptr: self.ptr }
    }
}

impl Drop for WeakActorRef {
    fn drop(&mut self) {
        // SAFETY: this handle owns exactly one weak count.
        unsafe { ControlBlock::release_weak(self.ptr) };
    }
}

macro_rules! address_semantics {
    ($handle:ty) => {
        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                self.addr() == other.addr()
            }
        }

        impl Eq for $handle {}

        impl PartialOrd for $handle {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $handle {
            fn cmp(&self, other: &Self) -> Ordering {
                self.addr().cmp(&other.addr())
            }
        }

        impl Hash for $handle {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.addr().hash(state);
            }
        }

        impl fmt::Display for $handle {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.addr())
            }
        }
    };
}

address_semantics!(StrongActorRef);
address_semantics!(WeakActorRef);

impl fmt::Debug for StrongActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrongActorRef").field(&self.addr()).finish()
    }
}

impl fmt::Debug for WeakActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakActorRef").field(&self.addr()).finish()
    }
}

impl From<&StrongActorRef> for WeakActorRef {
    fn from(handle: &StrongActorRef) -> Self {
        handle.downgrade()
    }
}

#[cfg(test)]
mod tests {
    use crate::system::ActorSystem;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_clone_and_drop_counts() {
        let system = ActorSystem::new("handles");
        let (actor, _mailbox) = system.spawn(());

        assert_eq!(actor.strong_count(), 1);
        let copy = actor.clone();
        assert_eq!(actor.strong_count(), 2);
        drop(copy);
        assert_eq!(actor.strong_count(), 1);

        // registry keeps one weak handle besides the implicit one
        assert_eq!(actor.weak_count(), 2);
        let weak = actor.downgrade();
        assert_eq!(actor.weak_count(), 3);
        let weak_copy = weak.clone();
        assert_eq!(actor.weak_count(), 4);
        drop((weak, weak_copy));
        assert_eq!(actor.weak_count(), 2);
    }

    #[test]
    fn test_handles_compare_by_address() {
        let system = ActorSystem::new("handles");
        let (a, _ma) = system.spawn(());
        let (b, _mb) = system.spawn(());

        let a_weak = a.downgrade();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a_weak.addr(), a.addr());

        let set: HashSet<_> = [a.clone(), a.clone(), b.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);

        let ordered: BTreeSet<_> = [b.downgrade(), a.downgrade()].into_iter().collect();
        assert_eq!(ordered.iter().next().map(|w| w.id()), Some(a.id()));
    }

    #[test]
    fn test_display_and_debug_show_address() {
        let system = ActorSystem::new("handles");
        let (actor, _mailbox) = system.spawn(());

        let expected = actor.addr().to_string();
        assert_eq!(actor.to_string(), expected);
        assert_eq!(actor.downgrade().to_string(), expected);
        assert!(format!("{:?}", actor).contains(&expected));
    }

    #[test]
    fn test_upgrade_fails_after_last_strong() {
        let system = ActorSystem::new("handles");
        let (actor, _mailbox) = system.spawn(());
        let weak = actor.downgrade();

        assert!(weak.is_alive());
        assert!(weak.upgrade().is_some());

        drop(actor);
        assert!(!weak.is_alive());
        for _ in 0..3 {
            assert!(weak.upgrade().is_none());
        }
    }

    #[test]
    fn test_empty_handles_are_none() {
        let empty: Option<crate::StrongActorRef> = None;
        let copy = empty.clone();
        assert!(copy.is_none());
        assert!(empty.as_ref().map(|h| h.downgrade()).is_none());
    }
}
