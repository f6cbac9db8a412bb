//! Streaming chat client for a WebSocket chat server.
//!
//! [`ChatSession`] is the I/O-free core: it reassembles streamed replies,
//! keeps the connection alive with application-level pings and reconnects
//! with exponential backoff after unexpected closes. [`ChatClient`] runs a
//! session on tokio over a `tokio-tungstenite` transport.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod observer;
pub mod protocol;
pub mod reassembler;
pub mod reconnect;
pub mod session;
pub mod theme;
pub mod timer;
pub mod transport;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use endpoint::{AuthPlacement, Endpoint};
pub use error::{ChatError, ChatResult, DecodeError};
pub use observer::{ConnectionState, DisconnectInfo, SessionEvent, SessionObserver};
pub use reassembler::CompletedTurn;
pub use session::{ChatSession, SessionConfig};
