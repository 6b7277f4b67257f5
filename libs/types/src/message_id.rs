//! Correlation identifiers for request/response matching.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const RESPONSE_FLAG: u64 = 1 << 63;
const REQUEST_FLAG: u64 = 1 << 62;
const ID_MASK: u64 = !(RESPONSE_FLAG | REQUEST_FLAG);

/// Correlation id attached to every mailbox element
///
/// The two high bits mark requests and responses; the remaining 62 bits
/// carry the request number chosen by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageId(u64);

impl MessageId {
    /// Fire-and-forget message, no correlation
    pub const ASYNC: MessageId = MessageId(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Request number `n`; only the low 62 bits are kept
    pub const fn request(n: u64) -> Self {
        Self(REQUEST_FLAG | (n & ID_MASK))
    }

    pub const fn is_async(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_request(&self) -> bool {
        self.0 & REQUEST_FLAG != 0
    }

    pub const fn is_response(&self) -> bool {
        self.0 & RESPONSE_FLAG != 0
    }

    pub const fn request_number(&self) -> u64 {
        self.0 & ID_MASK
    }

    /// The id a reply to this request must carry
    pub const fn response_id(&self) -> Self {
        if self.is_request() {
            Self(RESPONSE_FLAG | (self.0 & ID_MASK))
        } else {
            Self::ASYNC
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_async() {
            write!(f, "async")
        } else if self.is_response() {
            write!(f, "response#{}", self.request_number())
        } else {
            write!(f, "request#{}", self.request_number())
        }
    }
}
