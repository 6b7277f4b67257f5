//! Actor payload abstraction
//!
//! Whatever sits behind a control block implements [`AbstractActor`]: a local
//! actor with a mailbox, or a proxy forwarding to another node. Senders only
//! ever see the funnel on [`ControlBlock`], never the concrete type.

use crate::control_block::ControlBlock;
use crate::handle::StrongActorRef;
use crate::mailbox::{Mailbox, MailboxStatus};
use crate::messages::MailboxElement;
use std::fmt;
use tracing::trace;

/// Behavior shared by all actor payloads
pub trait AbstractActor: Send + Sync + 'static {
    /// Accept an element addressed to the actor owning `ctrl`
    fn enqueue(&self, ctrl: &ControlBlock, element: MailboxElement, host: Option<&dyn ExecutionUnit>);

    fn is_proxy(&self) -> bool {
        false
    }
}

/// Scheduling context of the caller, if it runs on a worker
pub trait ExecutionUnit: Send + Sync {
    fn worker_id(&self) -> usize;

    /// Resume `actor` later on this unit; called when its mailbox was empty
    fn exec_later(&self, actor: StrongActorRef);
}

/// Actor hosted on this node: a mailbox plus caller-defined state
pub struct LocalActor<S> {
    mailbox: Box<dyn Mailbox>,
    state: S,
}

impl<S: Send + Sync + 'static> LocalActor<S> {
    pub fn new(mailbox: Box<dyn Mailbox>, state: S) -> Self {
        Self { mailbox, state }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn mailbox(&self) -> &dyn Mailbox {
        self.mailbox.as_ref()
    }
}

impl<S: Send + Sync + 'static> AbstractActor for LocalActor<S> {
    fn enqueue(&self, ctrl: &ControlBlock, element: MailboxElement, host: Option<&dyn ExecutionUnit>) {
        match self.mailbox.push(element, host) {
            MailboxStatus::Queued => {}
            MailboxStatus::Unblocked => {
                if let Some(host) = host {
                    trace!(actor = %ctrl.addr(), worker = host.worker_id(), "rescheduling idle actor");
                    host.exec_later(ctrl.to_strong());
                }
            }
            MailboxStatus::Closed(element) => match ctrl.home_shared() {
                Some(home) => home.dead_letter(ctrl.addr(), element),
                None => trace!(actor = %ctrl.addr(), "mailbox closed, system gone"),
            },
        }
    }
}

impl<S> fmt::Debug for LocalActor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalActor")
            .field("closed", &self.mailbox.is_closed())
            .finish_non_exhaustive()
    }
}
