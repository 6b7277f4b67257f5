//! Remote actor proxy
//!
//! A proxy is a control block whose address names an actor on another node.
//! Enqueueing on it serialises the element into a `Deliver` frame and hands
//! it to the home system's transport. Failures never reach the sender: they
//! end in the dead-letter policy like a closed local mailbox would.

use crate::actor::{AbstractActor, ExecutionUnit};
use crate::control_block::ControlBlock;
use crate::messages::MailboxElement;
use crate::transport::encode_deliver;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Stand-in for an actor hosted on another node
#[derive(Debug, Default)]
pub struct ActorProxy {
    forwarded: AtomicU64,
}

impl ActorProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames handed to the transport so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}

impl AbstractActor for ActorProxy {
    fn enqueue(&self, ctrl: &ControlBlock, element: MailboxElement, _host: Option<&dyn ExecutionUnit>) {
        let addr = ctrl.addr();
        let Some(home) = ctrl.home_shared() else {
            debug!(actor = %addr, "proxy outlived its system, dropping element");
            return;
        };

        let Some(transport) = home.transport() else {
            warn!(actor = %addr, "no transport attached, cannot reach remote actor");
            home.dead_letter(addr, element);
            return;
        };

        let frame = match encode_deliver(&home.node, addr.id(), &element) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(actor = %addr, error = %e, "failed to encode deliver frame");
                home.dead_letter(addr, element);
                return;
            }
        };

        match transport.send_frame(&addr.node(), frame) {
            Ok(()) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                home.metrics.record_frame_sent();
                trace!(actor = %addr, msg_type = element.content.msg_type(), "forwarded to remote node");
            }
            Err(e) => {
                warn!(actor = %addr, error = %e, "transport rejected frame");
                home.dead_letter(addr, element);
            }
        }
    }

    fn is_proxy(&self) -> bool {
        true
    }
}
