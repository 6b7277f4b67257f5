//! Actor message types
//!
//! Content is opaque to the runtime: a type tag plus raw bytes, the same
//! shape the inter-process path already uses. Interpreting it is up to the
//! behavior that drains the mailbox.

use crate::handle::StrongActorRef;
use bytes::Bytes;
use types::MessageId;

/// Opaque message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    msg_type: String,
    data: Bytes,
}

impl Message {
    pub fn new(msg_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: data.into(),
        }
    }

    /// Message without payload bytes, e.g. a bare command
    pub fn signal(msg_type: impl Into<String>) -> Self {
        Self::new(msg_type, Bytes::new())
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Unit of work stored in a mailbox
#[derive(Debug, Clone)]
pub struct MailboxElement {
    /// Reply target, if any
    pub sender: Option<StrongActorRef>,
    pub mid: MessageId,
    pub content: Message,
}

impl MailboxElement {
    pub fn new(sender: Option<StrongActorRef>, mid: MessageId, content: Message) -> Self {
        Self {
            sender,
            mid,
            content,
        }
    }

    /// Fire-and-forget element without a sender
    pub fn anonymous(content: Message) -> Self {
        Self::new(None, MessageId::ASYNC, content)
    }
}
