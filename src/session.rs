//! The chat session state machine.
//!
//! [`ChatSession`] performs no I/O and never sleeps. The host feeds it facade
//! calls, transport events and fired timers, one at a time; it reacts by
//! calling the [`Transport`], the [`Scheduler`] and the [`SessionObserver`].
//! Serializing those inputs is the host's job (see [`crate::client`]).

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::endpoint::Endpoint;
use crate::error::{ChatError, ChatResult};
use crate::heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, HeartbeatMonitor, HeartbeatStats};
use crate::observer::{ConnectionState, DisconnectInfo, SessionObserver};
use crate::protocol::{ClientFrame, ServerFrame, decode_server_frame, encode_client_frame};
use crate::reassembler::StreamReassembler;
use crate::reconnect::{ReconnectController, ReconnectDecision, ReconnectPolicy};
use crate::timer::{Scheduler, TimerKind, TimerToken, TimerTokens};
use crate::transport::{ConnectionId, Transport, TransportEvent};

/// Timing knobs for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connecting { conn: ConnectionId },
    Open { conn: ConnectionId },
    /// Waiting for `timer` before the next automatic attempt.
    Reconnecting { timer: TimerToken },
}

pub struct ChatSession<T, S, O> {
    endpoint: Endpoint,
    transport: T,
    scheduler: S,
    observer: O,
    phase: Phase,
    last_conn: ConnectionId,
    tokens: TimerTokens,
    heartbeat: HeartbeatMonitor,
    reconnect: ReconnectController,
    reassembler: StreamReassembler,
    reported: ConnectionState,
}

impl<T, S, O> ChatSession<T, S, O>
where
    T: Transport,
    S: Scheduler,
    O: SessionObserver,
{
    pub fn new(
        endpoint: Endpoint,
        config: SessionConfig,
        transport: T,
        scheduler: S,
        observer: O,
    ) -> Self {
        Self {
            endpoint,
            transport,
            scheduler,
            observer,
            phase: Phase::Disconnected,
            last_conn: ConnectionId(0),
            tokens: TimerTokens::default(),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval),
            reconnect: ReconnectController::new(config.reconnect),
            reassembler: StreamReassembler::new(),
            reported: ConnectionState::Disconnected,
        }
    }

    /// Start connecting.
    ///
    /// A no-op while connecting or open. During a reconnect wait the pending
    /// timer is cancelled and the attempt starts right away. An endpoint that
    /// cannot produce a handshake request is reported through `on_error` and
    /// the session stays disconnected.
    pub fn connect(&mut self) {
        match self.phase {
            Phase::Connecting { conn } | Phase::Open { conn } => {
                debug!(%conn, "connect() ignored, connection already active");
            }
            Phase::Reconnecting { timer } => {
                self.scheduler.cancel(timer);
                self.open_connection();
            }
            Phase::Disconnected => {
                if let Err(err) = self.endpoint.validate() {
                    warn!(error = %err, "Endpoint unusable, not connecting");
                    self.observer.on_error(&err);
                    return;
                }
                self.reconnect.reset();
                self.open_connection();
            }
        }
    }

    /// Send user content for a conversation.
    ///
    /// Fails with `NotConnected` unless the connection is open; nothing is
    /// queued for later.
    pub fn send(&mut self, conversation_id: &str, content: &str) -> ChatResult<()> {
        let Phase::Open { conn } = self.phase else {
            return Err(ChatError::NotConnected);
        };
        if conversation_id.is_empty() {
            return Err(ChatError::InvalidMessage(
                "conversation_id must not be empty".into(),
            ));
        }
        if content.is_empty() {
            return Err(ChatError::InvalidMessage("content must not be empty".into()));
        }

        let text = encode_client_frame(&ClientFrame::message(conversation_id, content))
            .map_err(ChatError::InvalidMessage)?;
        self.transport.send(conn, text)?;
        debug!(%conn, conversation_id, bytes = content.len(), "Message sent");
        Ok(())
    }

    /// Close on purpose. No automatic reconnection follows. Idempotent.
    pub fn disconnect(&mut self) {
        self.heartbeat.stop(&mut self.scheduler);
        let was_open = match std::mem::replace(&mut self.phase, Phase::Disconnected) {
            Phase::Disconnected => return,
            Phase::Connecting { conn } => {
                self.transport.close(conn);
                false
            }
            Phase::Open { conn } => {
                self.transport.close(conn);
                true
            }
            Phase::Reconnecting { timer } => {
                self.scheduler.cancel(timer);
                false
            }
        };
        self.reconnect.reset();
        let turn_interrupted = self.reassembler.discard().is_some();
        info!(turn_interrupted, "Disconnected by request");

        if was_open {
            self.observer.on_disconnect(&DisconnectInfo {
                intentional: true,
                reason: None,
                turn_interrupted,
            });
        }
        self.publish_state();
    }

    /// Feed one event from the transport.
    pub fn handle_transport(&mut self, conn: ConnectionId, event: TransportEvent) {
        if self.current_conn() != Some(conn) {
            trace!(%conn, ?event, "Ignoring event from stale connection");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(conn),
            TransportEvent::Frame(text) => self.on_frame(&text),
            TransportEvent::Error(reason) => {
                warn!(%conn, error = %reason, "Connection error");
                self.observer.on_error(&ChatError::Connection(reason));
            }
            TransportEvent::Closed { reason } => self.on_closed(conn, reason),
        }
    }

    /// Feed one fired timer.
    pub fn handle_timer(&mut self, token: TimerToken) {
        match token.kind {
            TimerKind::Heartbeat => {
                if !self
                    .heartbeat
                    .on_tick(token, &mut self.scheduler, &mut self.tokens)
                {
                    trace!(generation = token.generation, "Ignoring stale heartbeat tick");
                    return;
                }
                if let Phase::Open { conn } = self.phase {
                    self.send_ping(conn);
                }
            }
            TimerKind::Reconnect => match self.phase {
                Phase::Reconnecting { timer } if timer == token => self.open_connection(),
                _ => trace!(generation = token.generation, "Ignoring stale reconnect timer"),
            },
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.phase {
            Phase::Disconnected => ConnectionState::Disconnected,
            Phase::Open { .. } => ConnectionState::Open,
            Phase::Connecting { .. } if self.reconnect.attempt() == 0 => {
                ConnectionState::Connecting
            }
            Phase::Connecting { .. } | Phase::Reconnecting { .. } => ConnectionState::Reconnecting {
                attempt: self.reconnect.attempt(),
            },
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Open { .. })
    }

    /// Consecutive automatic attempts since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.reconnect.attempt()
    }

    /// Connection the session is currently talking to, if any.
    pub fn current_conn(&self) -> Option<ConnectionId> {
        match self.phase {
            Phase::Connecting { conn } | Phase::Open { conn } => Some(conn),
            _ => None,
        }
    }

    pub fn heartbeat_stats(&self) -> HeartbeatStats {
        self.heartbeat.stats()
    }

    /// Text streamed so far for the reply in progress.
    pub fn partial_reply(&self) -> Option<&str> {
        self.reassembler.partial()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn open_connection(&mut self) {
        let conn = self.last_conn.next();
        self.last_conn = conn;
        self.phase = Phase::Connecting { conn };
        info!(
            %conn,
            endpoint = %self.endpoint,
            attempt = self.reconnect.attempt(),
            "Opening connection"
        );
        self.publish_state();
        self.transport.open(conn, &self.endpoint);
    }

    fn on_opened(&mut self, conn: ConnectionId) {
        if !matches!(self.phase, Phase::Connecting { .. }) {
            return;
        }
        self.phase = Phase::Open { conn };
        self.reconnect.on_open();
        self.heartbeat.start(&mut self.scheduler, &mut self.tokens);
        info!(%conn, "Connected");
        self.observer.on_connect();
        self.publish_state();
    }

    fn on_frame(&mut self, text: &str) {
        let frame = match decode_server_frame(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(frame = %text, "Ignoring frame of unknown type");
                return;
            }
            Err(err) => {
                warn!(error = %err, "Dropping undecodable frame");
                self.observer.on_error(&ChatError::Decode(err));
                return;
            }
        };

        match frame {
            ServerFrame::Token { content } => {
                self.reassembler.push_token(&content);
                self.observer.on_token(&content);
            }
            ServerFrame::Complete {
                message_id,
                conversation_id,
            } => {
                let turn = self.reassembler.complete(message_id, conversation_id);
                debug!(
                    message_id = %turn.message_id,
                    conversation_id = %turn.conversation_id,
                    chars = turn.content.len(),
                    "Turn complete"
                );
                self.observer.on_turn_complete(&turn);
            }
            ServerFrame::Error { message, code } => {
                if let Some(partial) = self.reassembler.discard() {
                    debug!(discarded = partial.len(), "Discarding partial reply");
                }
                warn!(code = code.as_deref().unwrap_or("-"), %message, "Server reported an error");
                self.observer.on_error(&ChatError::Server { code, message });
            }
            ServerFrame::Pong => {
                self.heartbeat.record_pong();
                trace!("Pong received");
            }
        }
    }

    fn on_closed(&mut self, conn: ConnectionId, reason: String) {
        let was_open = matches!(self.phase, Phase::Open { .. });
        self.heartbeat.stop(&mut self.scheduler);
        let turn_interrupted = self.reassembler.discard().is_some();

        if was_open {
            warn!(%conn, %reason, turn_interrupted, "Connection lost");
            self.observer.on_disconnect(&DisconnectInfo {
                intentional: false,
                reason: Some(reason),
                turn_interrupted,
            });
        } else {
            warn!(%conn, %reason, "Connection attempt failed");
        }

        match self.reconnect.on_unexpected_close() {
            ReconnectDecision::Retry { attempt, delay } => {
                let timer = self.tokens.issue(TimerKind::Reconnect);
                self.scheduler.schedule(timer, delay);
                self.phase = Phase::Reconnecting { timer };
                info!(attempt, ?delay, "Reconnect scheduled");
                self.publish_state();
            }
            ReconnectDecision::Exhausted { attempts } => {
                self.phase = Phase::Disconnected;
                error!(attempts, "Giving up on reconnecting");
                self.publish_state();
                self.observer
                    .on_error(&ChatError::ReconnectExhausted { attempts });
            }
        }
    }

    fn send_ping(&mut self, conn: ConnectionId) {
        let sent = encode_client_frame(&ClientFrame::Ping)
            .map_err(ChatError::InvalidMessage)
            .and_then(|text| self.transport.send(conn, text));
        match sent {
            Ok(()) => {
                self.heartbeat.record_ping();
                trace!(%conn, "Ping sent");
            }
            Err(err) => debug!(%conn, error = %err, "Ping not sent"),
        }
    }

    fn publish_state(&mut self) {
        let state = self.state();
        if state != self.reported {
            self.reported = state;
            debug!(?state, "State changed");
            self.observer.on_state_change(state);
        }
    }
}
