//! Correlation ids.
//!
//! Id 0 is reserved for notifications. Each endpoint allocates the ids of its
//! own outbound calls from one half of the integer line, so a reply can be
//! told apart from a peer's malformed request by its sign. Invocations are
//! always requests; see [`Message::kind`](crate::Message::kind). This follows the Vim
//! channel convention: the editor numbers its requests with positive ids and
//! the process on the other end of the channel uses negative ids.

/// The reserved "no reply expected" id.
pub const NOTIFICATION_ID: i64 = 0;

/// Half of the id line used for locally issued calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdSpace {
    /// `-1, -2, ...` (host side of a Vim-style channel).
    #[default]
    Negative,
    /// `1, 2, ...` (plugin side).
    Positive,
}

impl IdSpace {
    /// Returns true if `id` belongs to this half of the id line.
    pub fn contains(self, id: i64) -> bool {
        match self {
            IdSpace::Negative => id < 0,
            IdSpace::Positive => id > 0,
        }
    }

    /// The `n`-th id of this space, counting from 1. `n == 0` is clamped to 1.
    pub fn nth(self, n: u64) -> i64 {
        let magnitude = i64::try_from(n.max(1)).unwrap_or(i64::MAX);
        match self {
            IdSpace::Negative => -magnitude,
            IdSpace::Positive => magnitude,
        }
    }

    /// The opposite half, i.e. the space a well-behaved peer allocates from.
    pub fn opposite(self) -> Self {
        match self {
            IdSpace::Negative => IdSpace::Positive,
            IdSpace::Positive => IdSpace::Negative,
        }
    }

    /// Human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            IdSpace::Negative => "negative",
            IdSpace::Positive => "positive",
        }
    }
}

/// What an inbound message's id means to the local endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Fire-and-forget message.
    Notification,
    /// The peer asks for a reply correlated by this id.
    Request,
    /// A reply to one of our own calls.
    Reply,
}

/// Classify an inbound id by sign alone, given the space our outbound calls use.
pub fn classify_id(id: i64, outbound: IdSpace) -> IdKind {
    if id == NOTIFICATION_ID {
        IdKind::Notification
    } else if outbound.contains(id) {
        IdKind::Reply
    } else {
        IdKind::Request
    }
}
