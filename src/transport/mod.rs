//! Raw connection primitive.
//!
//! The session owns exactly one logical connection at a time and names each
//! physical attempt with a fresh [`ConnectionId`]. Transports report back
//! through [`TransportEvent`]s tagged with that id, so anything arriving from
//! an older attempt can be told apart and dropped.

mod ws;

pub use ws::WsTransport;

use std::fmt;

use crate::endpoint::Endpoint;
use crate::error::ChatResult;

/// Identity of one physical connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Something that happened on a connection.
///
/// After `open`, a transport delivers exactly one of `Opened` or `Error`,
/// possibly followed by further `Frame`/`Error` events, and always exactly
/// one `Closed` at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// One inbound text frame, undecoded.
    Frame(String),
    Error(String),
    Closed { reason: String },
}

pub trait Transport {
    /// Start opening a connection. Failures arrive later as events.
    fn open(&mut self, conn: ConnectionId, endpoint: &Endpoint);

    /// Write one text frame. Fails with `NotConnected` unless `conn` is open.
    fn send(&mut self, conn: ConnectionId, text: String) -> ChatResult<()>;

    /// User-initiated shutdown of `conn`, including one still opening.
    fn close(&mut self, conn: ConnectionId);
}
