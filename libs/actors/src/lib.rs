//! Actor Identity and Lifetime Core
//!
//! Every actor is a single allocation: a reference-counted control block
//! followed by the actor's private data. Handles point at the block; the
//! same handle type works whether the actor runs on this node or is reached
//! through a proxy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │  ActorSystem (node A)│        │  ActorSystem (node B)│
//! │                      │        │                      │
//! │  ┌────────────────┐  │ frame  │  ┌────────────────┐  │
//! │  │ proxy  7@B     │──┼────────┼─►│ registry       │  │
//! │  │ (ControlBlock) │  │Deliver │  │  7 → weak ref  │  │
//! │  └────────────────┘  │        │  └───────┬────────┘  │
//! │          ▲           │        │          ▼           │
//! │  ProxyRegistry       │◄───────┼──  LocalActor 7@B    │
//! │  (terminated set)    │  Down  │   (mailbox + state)  │
//! └──────────────────────┘        └──────────────────────┘
//! ```
//!
//! - [`StrongActorRef`] keeps the data alive and exposes the delivery funnel
//! - [`WeakActorRef`] observes without owning; upgrade fails forever once the
//!   data is gone
//! - handles travel between nodes as addresses and are resolved against the
//!   receiving system
//!
//! # Examples
//!
//! ```rust
//! use actors::{ActorSystem, Message, MessageId};
//!
//! let system = ActorSystem::new("example");
//! let (actor, mut mailbox) = system.spawn(());
//!
//! actor.enqueue(None, MessageId::ASYNC, Message::new("hello", b"actor".to_vec()), None);
//! assert_eq!(mailbox.try_recv().unwrap().content.msg_type(), "hello");
//!
//! let weak = actor.downgrade();
//! drop(actor);
//! assert!(weak.upgrade().is_none());
//! ```

pub mod actor;
pub mod control_block;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod messages;
pub mod proxy;
pub mod registry;
pub mod serialization;
pub mod system;
pub mod transport;

pub use actor::{AbstractActor, ExecutionUnit, LocalActor};
pub use control_block::ControlBlock;
pub use error::{ActorError, Result};
pub use handle::{StrongActorRef, WeakActorRef};
pub use mailbox::{ChannelMailbox, Mailbox, MailboxReceiver, MailboxStatus};
pub use messages::{MailboxElement, Message};
pub use proxy::ActorProxy;
pub use registry::{ActorRegistry, ProxyRegistry, MAX_TERMINATED_ENTRIES};
pub use serialization::{
    decode_strong, decode_weak, encode_strong, encode_weak, read_strong, read_weak, write_strong,
    write_weak,
};
pub use system::{ActorSystem, ActorSystemBuilder, DeadLetter, MetricsSnapshot, SystemMetrics};
pub use transport::{LoopbackNetwork, Transport};
pub use types::{ActorAddr, ActorId, MessageId, NodeId};
