use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tracing::{debug, warn};

use super::{ConnectionId, Transport, TransportEvent};
use crate::endpoint::Endpoint;
use crate::error::{ChatError, ChatResult};

/// How long a graceful close may take before the socket is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

enum Outbound {
    Text(String),
    Close,
}

struct ActiveConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    opened: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// [`Transport`] over `tokio-tungstenite`.
///
/// Each connection runs in its own task which owns the socket. Events are
/// pushed into the driver's queue as `E::from((id, event))`. A new
/// connection does not start until the previous task has finished, so at
/// most one socket is live at a time.
pub struct WsTransport<E> {
    events: mpsc::UnboundedSender<E>,
    active: Option<ActiveConnection>,
    /// Task of a connection that was asked to close and may still be
    /// finishing its close handshake.
    closing: Option<JoinHandle<()>>,
}

impl<E> WsTransport<E> {
    pub fn new(events: mpsc::UnboundedSender<E>) -> Self {
        Self {
            events,
            active: None,
            closing: None,
        }
    }

    /// Id of the connection currently owned, if any.
    pub fn active(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }
}

impl<E> Transport for WsTransport<E>
where
    E: From<(ConnectionId, TransportEvent)> + Send + 'static,
{
    fn open(&mut self, conn: ConnectionId, endpoint: &Endpoint) {
        let mut predecessors = Vec::with_capacity(2);
        if let Some(previous) = self.active.take() {
            debug!(conn = %previous.id, "Dropping previous connection");
            previous.task.abort();
            predecessors.push(previous.task);
        }
        predecessors.extend(self.closing.take());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let opened = Arc::new(AtomicBool::new(false));
        let events = self.events.clone();

        let task = match endpoint.client_request() {
            Ok(request) => {
                let timeout = endpoint.connect_timeout();
                let opened = Arc::clone(&opened);
                tokio::spawn(async move {
                    wait_for_predecessors(predecessors).await;
                    let reason =
                        run_connection(conn, request, timeout, outbound_rx, &events, &opened).await;
                    opened.store(false, Ordering::Release);
                    let _ = events.send(E::from((conn, TransportEvent::Closed { reason })));
                })
            }
            Err(err) => tokio::spawn(async move {
                wait_for_predecessors(predecessors).await;
                let reason = err.to_string();
                let _ = events.send(E::from((conn, TransportEvent::Error(reason.clone()))));
                let _ = events.send(E::from((conn, TransportEvent::Closed { reason })));
            }),
        };

        self.active = Some(ActiveConnection {
            id: conn,
            outbound: outbound_tx,
            opened,
            task,
        });
    }

    fn send(&mut self, conn: ConnectionId, text: String) -> ChatResult<()> {
        match &self.active {
            Some(active) if active.id == conn && active.opened.load(Ordering::Acquire) => active
                .outbound
                .send(Outbound::Text(text))
                .map_err(|_| ChatError::NotConnected),
            _ => Err(ChatError::NotConnected),
        }
    }

    fn close(&mut self, conn: ConnectionId) {
        match self.active.take() {
            Some(active) if active.id == conn => {
                // The task finishes the close handshake on its own and still
                // reports `Closed`. The next `open` waits for it.
                if active.outbound.send(Outbound::Close).is_err() {
                    active.task.abort();
                }
                if let Some(stale) = self.closing.replace(active.task) {
                    stale.abort();
                }
            }
            other => self.active = other,
        }
    }
}

impl<E> Drop for WsTransport<E> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
        if let Some(closing) = self.closing.take() {
            closing.abort();
        }
    }
}

async fn wait_for_predecessors(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        // Cancellation is the expected outcome for aborted tasks.
        let _ = handle.await;
    }
}

/// Drive one connection to its end and return the close reason.
async fn run_connection<E>(
    conn: ConnectionId,
    request: Request,
    timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::UnboundedSender<E>,
    opened: &AtomicBool,
) -> String
where
    E: From<(ConnectionId, TransportEvent)>,
{
    let emit = |event: TransportEvent| {
        let _ = events.send(E::from((conn, event)));
    };

    let handshake = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request));
    tokio::pin!(handshake);

    let stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(err)) => {
                    let reason = err.to_string();
                    emit(TransportEvent::Error(reason.clone()));
                    return reason;
                }
                Err(_) => {
                    let reason = format!("connect timed out after {timeout:?}");
                    emit(TransportEvent::Error(reason.clone()));
                    return reason;
                }
            },
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(_)) => continue,
                Some(Outbound::Close) | None => return "closed while connecting".to_string(),
            },
        }
    };

    debug!(%conn, "WebSocket handshake complete");
    opened.store(true, Ordering::Release);
    emit(TransportEvent::Opened);

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEvent::Frame(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    emit(TransportEvent::Frame(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) if !frame.reason.as_str().is_empty() => {
                            format!("server closed: {} ({})", frame.reason.as_str(), frame.code)
                        }
                        Some(frame) => format!("server closed ({})", frame.code),
                        None => "server closed".to_string(),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let reason = err.to_string();
                    warn!(%conn, error = %reason, "WebSocket read failed");
                    emit(TransportEvent::Error(reason.clone()));
                    return reason;
                }
                None => return "stream ended".to_string(),
            },
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(err) = sink.send(Message::text(text)).await {
                        let reason = err.to_string();
                        warn!(%conn, error = %reason, "WebSocket write failed");
                        emit(TransportEvent::Error(reason.clone()));
                        return reason;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
                    return "closed by client".to_string();
                }
            },
        }
    }
}
