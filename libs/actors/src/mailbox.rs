//! Mailboxes
//!
//! The funnel only needs to push into a mailbox and learn whether the push
//! landed. [`ChannelMailbox`] is the default: an unbounded tokio channel whose
//! receiving half goes to whatever drives the actor's behavior.

use crate::actor::ExecutionUnit;
use crate::messages::MailboxElement;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Outcome of a mailbox push
#[derive(Debug)]
pub enum MailboxStatus {
    /// Stored behind other pending elements
    Queued,
    /// Stored in an empty mailbox; the reader may need to be woken
    Unblocked,
    /// The mailbox no longer accepts elements; ownership goes back to the caller
    Closed(MailboxElement),
}

/// Storage for elements waiting to be processed
pub trait Mailbox: Send + Sync + 'static {
    fn push(&self, element: MailboxElement, host: Option<&dyn ExecutionUnit>) -> MailboxStatus;

    /// Stop accepting elements
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Unbounded mailbox backed by `tokio::sync::mpsc`
#[derive(Debug)]
pub struct ChannelMailbox {
    tx: mpsc::UnboundedSender<MailboxElement>,
    pending: Arc<AtomicUsize>,
    closed: AtomicBool,
    warn_threshold: usize,
}

/// Receiving half of a [`ChannelMailbox`]
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::UnboundedReceiver<MailboxElement>,
    pending: Arc<AtomicUsize>,
}

impl ChannelMailbox {
    pub fn new(warn_threshold: usize) -> (Self, MailboxReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let mailbox = Self {
            tx,
            pending: pending.clone(),
            closed: AtomicBool::new(false),
            warn_threshold,
        };
        (mailbox, MailboxReceiver { rx, pending })
    }

    /// Number of elements pushed but not yet received
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

impl Mailbox for ChannelMailbox {
    fn push(&self, element: MailboxElement, host: Option<&dyn ExecutionUnit>) -> MailboxStatus {
        if self.closed.load(Ordering::Acquire) {
            return MailboxStatus::Closed(element);
        }

        let before = self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(mpsc::error::SendError(element)) = self.tx.send(element) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return MailboxStatus::Closed(element);
        }

        if before + 1 == self.warn_threshold {
            warn!(
                pending = before + 1,
                threshold = self.warn_threshold,
                "Mailbox backlog reached warning threshold"
            );
        }
        trace!(
            pending = before + 1,
            worker = host.map(|h| h.worker_id()),
            "element queued"
        );

        if before == 0 {
            MailboxStatus::Unblocked
        } else {
            MailboxStatus::Queued
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

impl MailboxReceiver {
    /// Wait for the next element; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<MailboxElement> {
        let element = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(element)
    }

    pub fn try_recv(&mut self) -> Option<MailboxElement> {
        let element = self.rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(element)
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<MailboxElement> {
        let mut out = Vec::new();
        while let Some(element) = self.try_recv() {
            out.push(element);
        }
        out
    }

    /// Refuse further elements; queued ones can still be received
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}
