//! Tokio driver for [`ChatSession`].
//!
//! One task owns the session. Host commands, transport events and fired
//! timers all reach it through channels and are handled strictly one after
//! another, so the session itself needs no locking.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::endpoint::Endpoint;
use crate::error::{ChatError, ChatResult};
use crate::observer::{ConnectionState, SessionEvent, SessionObserver};
use crate::session::{ChatSession, SessionConfig};
use crate::timer::{TimerToken, TokioScheduler};
use crate::transport::{ConnectionId, TransportEvent, WsTransport};

/// Everything the driver task can be woken by, besides host commands.
#[derive(Debug)]
pub enum DriverEvent {
    Transport(ConnectionId, TransportEvent),
    Timer(TimerToken),
}

impl From<(ConnectionId, TransportEvent)> for DriverEvent {
    fn from((conn, event): (ConnectionId, TransportEvent)) -> Self {
        Self::Transport(conn, event)
    }
}

impl From<TimerToken> for DriverEvent {
    fn from(token: TimerToken) -> Self {
        Self::Timer(token)
    }
}

enum Command {
    Connect,
    Send {
        conversation_id: String,
        content: String,
        reply: oneshot::Sender<ChatResult<()>>,
    },
    Disconnect,
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
    Shutdown,
}

type WsSession<O> = ChatSession<WsTransport<DriverEvent>, TokioScheduler<DriverEvent>, O>;

/// Handle to a running chat session.
///
/// Dropping the handle disconnects and stops the driver task.
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ChatClient {
    /// Spawn the driver on the current tokio runtime. Nothing connects until
    /// [`ChatClient::connect`] is called.
    pub fn spawn<O>(endpoint: Endpoint, config: SessionConfig, observer: O) -> Self
    where
        O: SessionObserver + Send + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(
            endpoint,
            config,
            WsTransport::new(events.clone()),
            TokioScheduler::new(events),
            observer,
        );
        let task = tokio::spawn(run(session, command_rx, event_rx));
        Self { commands, task }
    }

    /// Spawn with a channel observer and return its receiving end.
    pub fn with_events(
        endpoint: Endpoint,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::spawn(endpoint, config, tx), rx)
    }

    pub fn connect(&self) -> ChatResult<()> {
        self.command(Command::Connect)
    }

    /// Send a message. Resolves once the session accepted or rejected it.
    pub async fn send(
        &self,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> ChatResult<()> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send {
            conversation_id: conversation_id.into(),
            content: content.into(),
            reply,
        })?;
        rx.await.map_err(|_| ChatError::NotConnected)?
    }

    pub fn disconnect(&self) -> ChatResult<()> {
        self.command(Command::Disconnect)
    }

    pub async fn state(&self) -> ChatResult<ConnectionState> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::State { reply })?;
        rx.await.map_err(|_| ChatError::NotConnected)
    }

    /// Disconnect and wait for the driver task to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }

    fn command(&self, command: Command) -> ChatResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ChatError::NotConnected)
    }
}

#[instrument(name = "chat_driver", skip_all)]
async fn run<O>(
    mut session: WsSession<O>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
) where
    O: SessionObserver,
{
    debug!(endpoint = %session.endpoint(), "Driver started");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Connect) => session.connect(),
                Some(Command::Send { conversation_id, content, reply }) => {
                    let _ = reply.send(session.send(&conversation_id, &content));
                }
                Some(Command::Disconnect) => session.disconnect(),
                Some(Command::State { reply }) => {
                    let _ = reply.send(session.state());
                }
                Some(Command::Shutdown) | None => {
                    session.disconnect();
                    break;
                }
            },
            Some(event) = events.recv() => match event {
                DriverEvent::Transport(conn, event) => session.handle_transport(conn, event),
                DriverEvent::Timer(token) => session.handle_timer(token),
            },
        }
    }
    debug!("Driver stopped");
}
