//! Notifications from the session to the host.

use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::reassembler::CompletedTurn;

/// Connection state as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// Waiting for, or performing, automatic attempt `attempt`.
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectInfo {
    /// `true` when the host called `disconnect()`.
    pub intentional: bool,
    pub reason: Option<String>,
    /// A reply was streaming and its partial text was discarded.
    pub turn_interrupted: bool,
}

/// Callbacks invoked by the session, one per event, never re-entrantly.
///
/// Every method defaults to a no-op.
pub trait SessionObserver {
    fn on_connect(&mut self) {}

    /// One streamed fragment, as received.
    fn on_token(&mut self, _fragment: &str) {}

    fn on_turn_complete(&mut self, _turn: &CompletedTurn) {}

    fn on_error(&mut self, _error: &ChatError) {}

    /// Only fired for a connection that had opened.
    fn on_disconnect(&mut self, _info: &DisconnectInfo) {}

    fn on_state_change(&mut self, _state: ConnectionState) {}
}

impl SessionObserver for () {}

/// Owned form of every observer callback, for channel-based hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Token(String),
    TurnComplete(CompletedTurn),
    Error(ChatError),
    Disconnected(DisconnectInfo),
    StateChanged(ConnectionState),
}

/// Observer that forwards every callback as a [`SessionEvent`]. Events
/// sent after the receiver is gone are dropped.
impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn on_connect(&mut self) {
        let _ = self.send(SessionEvent::Connected);
    }

    fn on_token(&mut self, fragment: &str) {
        let _ = self.send(SessionEvent::Token(fragment.to_owned()));
    }

    fn on_turn_complete(&mut self, turn: &CompletedTurn) {
        let _ = self.send(SessionEvent::TurnComplete(turn.clone()));
    }

    fn on_error(&mut self, error: &ChatError) {
        let _ = self.send(SessionEvent::Error(error.clone()));
    }

    fn on_disconnect(&mut self, info: &DisconnectInfo) {
        let _ = self.send(SessionEvent::Disconnected(info.clone()));
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        let _ = self.send(SessionEvent::StateChanged(state));
    }
}

/// Recording observer, mostly useful in tests.
impl SessionObserver for Vec<SessionEvent> {
    fn on_connect(&mut self) {
        self.push(SessionEvent::Connected);
    }

    fn on_token(&mut self, fragment: &str) {
        self.push(SessionEvent::Token(fragment.to_owned()));
    }

    fn on_turn_complete(&mut self, turn: &CompletedTurn) {
        self.push(SessionEvent::TurnComplete(turn.clone()));
    }

    fn on_error(&mut self, error: &ChatError) {
        self.push(SessionEvent::Error(error.clone()));
    }

    fn on_disconnect(&mut self, info: &DisconnectInfo) {
        self.push(SessionEvent::Disconnected(info.clone()));
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        self.push(SessionEvent::StateChanged(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_observer_forwards_events() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
        tx.on_connect();
        tx.on_token("Hel");
        tx.on_state_change(ConnectionState::Open);

        assert_eq!(rx.recv().await, Some(SessionEvent::Connected));
        assert_eq!(rx.recv().await, Some(SessionEvent::Token("Hel".into())));
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::StateChanged(ConnectionState::Open))
        );
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (mut tx, rx) = mpsc::unbounded_channel::<SessionEvent>();
        drop(rx);
        tx.on_error(&ChatError::NotConnected);
    }
}
