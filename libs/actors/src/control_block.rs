//! Actor Control Block
//!
//! Every actor lives in a single allocation that starts with a
//! [`ControlBlock`] followed by the actor's private data:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            ActorStorage<T>               │
//! ├───────────────────┬──────────────────────┤
//! │  control block    │  actor data (T)      │
//! ├───────────────────┼──────────────────────┤
//! │  strong count     │  mailbox             │
//! │  weak count       │  state               │
//! │  address          │  ...                 │
//! │  home system      │                      │
//! │  dtor callbacks   │                      │
//! └───────────────────┴──────────────────────┘
//! ```
//!
//! Both counters start at 1. The initial strong count is adopted by the first
//! [`StrongActorRef`]; the initial weak count is held by the strong side as a
//! group and released once, right after the data is destroyed.
//!
//! - data is destroyed exactly once, when strong goes 1 → 0
//! - storage is released exactly once, when weak goes 1 → 0
//!
//! Increments are `Relaxed`: the caller already owns a reference. A decrement
//! is `Release`, and the thread that observes the count hit zero issues an
//! `Acquire` fence before running a destructor, so every access made through
//! any released reference happens-before the destructor.

use crate::actor::{AbstractActor, ExecutionUnit};
use crate::handle::StrongActorRef;
use crate::messages::{MailboxElement, Message};
use crate::system::{ActorSystem, SystemShared};
use std::any::TypeId;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use std::sync::Weak;
use tracing::trace;
use types::{ActorAddr, ActorId, MessageId, NodeId};

type DataDestructor = unsafe fn(NonNull<ControlBlock>);
type BlockDestructor = unsafe fn(NonNull<ControlBlock>);
type DataAccessor = unsafe fn(NonNull<ControlBlock>) -> NonNull<dyn AbstractActor>;

/// Reference-counted header shared by all handles to one actor
pub struct ControlBlock {
    strong: AtomicUsize,
    weak: AtomicUsize,
    addr: ActorAddr,
    /// Non-owning back-pointer to the hosting system
    home: Weak<SystemShared>,
    type_id: TypeId,
    /// Pointer to this block carrying the whole allocation's provenance
    this: NonNull<ControlBlock>,
    data_dtor: DataDestructor,
    block_dtor: BlockDestructor,
    data: DataAccessor,
}

/// The single allocation holding header and payload.
///
/// `repr(C)` keeps the block at offset 0, so a pointer to the storage is also
/// a valid pointer to its block.
#[repr(C)]
struct ActorStorage<T> {
    block: ControlBlock,
    data: ManuallyDrop<T>,
}

unsafe fn destroy_data<T: AbstractActor>(block: NonNull<ControlBlock>) {
    let storage = block.cast::<ActorStorage<T>>().as_ptr();
    // SAFETY: strong count just reached zero, nobody can reach the data anymore
    // and this runs exactly once per allocation.
    unsafe { ManuallyDrop::drop(&mut (*storage).data) };
}

unsafe fn release_storage<T: AbstractActor>(block: NonNull<ControlBlock>) {
    // SAFETY: allocated by `ControlBlock::allocate::<T>` through `Box`; the weak
    // count reached zero so this is the last pointer. `data` is `ManuallyDrop`
    // and was already destroyed.
    drop(unsafe { Box::from_raw(block.cast::<ActorStorage<T>>().as_ptr()) });
}

unsafe fn data_of<T: AbstractActor>(block: NonNull<ControlBlock>) -> NonNull<dyn AbstractActor> {
    let storage = block.cast::<ActorStorage<T>>().as_ptr();
    // SAFETY: storage is a live allocation; ManuallyDrop<T> is repr(transparent).
    let data = unsafe { ptr::addr_of_mut!((*storage).data) }.cast::<T>();
    // SAFETY: derived from a non-null allocation.
    unsafe { NonNull::new_unchecked(data as *mut dyn AbstractActor) }
}

impl ControlBlock {
    /// Allocate header and `data` together and return the first strong handle.
    pub(crate) fn allocate<T: AbstractActor>(
        addr: ActorAddr,
        home: Weak<SystemShared>,
        data: T,
    ) -> StrongActorRef {
        let storage = Box::new(ActorStorage {
            block: ControlBlock {
                strong: AtomicUsize::new(1),
                weak: AtomicUsize::new(1),
                addr,
                home,
                type_id: TypeId::of::<T>(),
                this: NonNull::dangling(),
                data_dtor: destroy_data::<T>,
                block_dtor: release_storage::<T>,
                data: data_of::<T>,
            },
            data: ManuallyDrop::new(data),
        });
        let block = NonNull::from(Box::leak(storage)).cast::<ControlBlock>();
        // SAFETY: not shared with anyone yet.
        unsafe { (*block.as_ptr()).this = block };
        trace!(actor = %addr, "control block allocated");
        // SAFETY: fresh block with strong = 1, adopted by the handle.
        unsafe { StrongActorRef::from_raw(block) }
    }

    pub fn addr(&self) -> ActorAddr {
        self.addr
    }

    pub fn id(&self) -> ActorId {
        self.addr.id()
    }

    pub fn node(&self) -> NodeId {
        self.addr.node()
    }

    /// The system hosting this block, if it is still running
    pub fn home_system(&self) -> Option<ActorSystem> {
        self.home.upgrade().map(ActorSystem::from_shared)
    }

    pub(crate) fn home_shared(&self) -> Option<std::sync::Arc<SystemShared>> {
        self.home.upgrade()
    }

    /// The actor's private data
    ///
    /// A `&ControlBlock` is only reachable through a [`StrongActorRef`] (or
    /// from inside the funnel, which is entered through one), so the data is
    /// alive for the duration of the borrow.
    pub fn get(&self) -> &dyn AbstractActor {
        // SAFETY: see above; the accessor was instantiated for the stored type.
        unsafe { (self.data)(self.this).as_ref() }
    }

    pub(crate) fn data_type_id(&self) -> TypeId {
        self.type_id
    }

    /// A new strong handle to this actor; see [`ControlBlock::get`] for why
    /// the strong count is known to be non-zero here.
    pub fn to_strong(&self) -> StrongActorRef {
        self.add_strong();
        // SAFETY: count incremented above on behalf of the new handle.
        unsafe { StrongActorRef::from_raw(self.this) }
    }

    /// Submit a new message to this actor
    ///
    /// Never fails from the caller's point of view: a closed or unreachable
    /// mailbox is handled by the hosting system's dead-letter policy.
    pub fn enqueue(
        &self,
        sender: Option<StrongActorRef>,
        mid: MessageId,
        content: Message,
        host: Option<&dyn ExecutionUnit>,
    ) {
        self.enqueue_element(MailboxElement::new(sender, mid, content), host);
    }

    /// Submit an already built mailbox element (e.g. relayed from the network)
    pub fn enqueue_element(&self, element: MailboxElement, host: Option<&dyn ExecutionUnit>) {
        self.get().enqueue(self, element, host);
    }

    pub(crate) fn strong_count(&self) -> usize {
        self.strong.load(Ordering::Relaxed)
    }

    pub(crate) fn weak_count(&self) -> usize {
        self.weak.load(Ordering::Relaxed)
    }

    pub(crate) fn add_strong(&self) {
        self.strong.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop one strong reference.
    ///
    /// # Safety
    ///
    /// `this` must be a live block and the caller must own one strong count.
    pub(crate) unsafe fn release_strong(this: NonNull<ControlBlock>) {
        // SAFETY: caller owns a strong count, so the block is alive.
        let block = unsafe { this.as_ref() };
        let prev = block.strong.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "strong count underflow on {}", block.addr);
        if prev != 1 {
            return;
        }
        fence(Ordering::Acquire);

        let addr = block.addr;
        let home = block.home.upgrade();
        trace!(actor = %addr, "destroying actor data");
        // SAFETY: strong reached zero exactly once, here.
        unsafe { (block.data_dtor)(this) };
        if let Some(home) = &home {
            home.on_data_destroyed(addr);
        }
        drop(home);

        // SAFETY: the implicit weak reference held by the strong side.
        unsafe { Self::release_weak(this) };
    }

    pub(crate) fn add_weak(&self) {
        self.weak.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop one weak reference.
    ///
    /// # Safety
    ///
    /// `this` must be a live block and the caller must own one weak count.
    pub(crate) unsafe fn release_weak(this: NonNull<ControlBlock>) {
        // SAFETY: caller owns a weak count, so the storage is alive.
        let block = unsafe { this.as_ref() };
        let prev = block.weak.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "weak count underflow on {}", block.addr);
        if prev != 1 {
            return;
        }
        fence(Ordering::Acquire);

        trace!(actor = %block.addr, "releasing control block storage");
        if let Some(home) = block.home.upgrade() {
            home.metrics.record_block_released();
        }
        // SAFETY: weak reached zero exactly once, here; `block` is not used after.
        unsafe { (block.block_dtor)(this) };
    }

    /// Try to take a strong reference without a lock.
    ///
    /// Returns `false` once the strong count has reached zero; it can never
    /// come back from zero, so failure is permanent.
    pub(crate) fn upgrade_weak(&self) -> bool {
        let mut current = self.strong.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match self.strong.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

impl fmt::Debug for ControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBlock")
            .field("addr", &self.addr)
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::WeakActorRef;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    /// Payload that records its own destruction
    struct Probe {
        drops: Arc<AtomicUsize>,
    }

    impl AbstractActor for Probe {
        fn enqueue(&self, _ctrl: &ControlBlock, _element: MailboxElement, _host: Option<&dyn ExecutionUnit>) {}
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe() -> (StrongActorRef, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let addr = ActorAddr::new(NodeId::random(), ActorId::new(1));
        let handle = ControlBlock::allocate(addr, Weak::new(), Probe { drops: drops.clone() });
        (handle, drops)
    }

    #[test]
    fn test_initial_counts() {
        let (handle, drops) = probe();
        assert_eq!(handle.strong_count(), 1);
        assert_eq!(handle.weak_count(), 1);
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_data_destroyed_before_storage() {
        let (handle, drops) = probe();
        let weak = handle.downgrade();
        assert_eq!(weak.weak_count(), 2);

        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        // storage still alive: implicit weak released, explicit one remains
        assert_eq!(weak.weak_count(), 1);
        assert_eq!(weak.strong_count(), 0);
        assert!(weak.upgrade().is_none());
        drop(weak);
    }

    #[test]
    fn test_upgrade_increments_strong() {
        let (handle, _drops) = probe();
        let weak = handle.downgrade();
        let upgraded = weak.upgrade().unwrap();
        assert_eq!(handle.strong_count(), 2);
        assert!(StrongActorRef::ptr_eq(&handle, &upgraded));
    }

    #[test]
    fn test_downcast_uses_stored_type() {
        let (handle, _drops) = probe();
        assert!(handle.downcast_ref::<Probe>().is_some());
        assert!(handle.downcast_ref::<crate::proxy::ActorProxy>().is_none());
    }

    #[test]
    fn test_concurrent_strong_clone_drop() {
        let (handle, drops) = probe();
        let weak = handle.downgrade();

        thread::scope(|s| {
            for _ in 0..8 {
                let local = handle.clone();
                s.spawn(move || {
                    for _ in 0..1_000 {
                        let c = local.clone();
                        drop(c);
                    }
                });
            }
        });

        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert_eq!(handle.strong_count(), 1);
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_concurrent_upgrade_races_last_drop() {
        for _ in 0..50 {
            let (handle, drops) = probe();
            let weaks: Vec<WeakActorRef> = (0..4).map(|_| handle.downgrade()).collect();

            thread::scope(|s| {
                for weak in &weaks {
                    s.spawn(move || {
                        for _ in 0..100 {
                            if let Some(strong) = weak.upgrade() {
                                assert!(strong.strong_count() >= 1);
                            }
                        }
                    });
                }
                s.spawn(move || drop(handle));
            });

            assert_eq!(drops.load(Ordering::SeqCst), 1);
            for weak in &weaks {
                assert!(weak.upgrade().is_none());
            }
        }
    }
}
