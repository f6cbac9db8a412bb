//! Error taxonomy for the chat client.

use crate::protocol::ServerErrorCode;

/// Result alias used across the client.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// An inbound frame that could not be turned into a [`crate::protocol::ServerFrame`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Every failure the session can report.
///
/// None of these are fatal to the host; after any of them the session can be
/// driven back to a working state with `connect()`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// `send` was called while the connection was not open.
    #[error("not connected")]
    NotConnected,

    /// The outbound message was rejected before reaching the wire.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The server address could not be turned into a connection request.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// An inbound frame was malformed. The connection stays open.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport failure while opening or at runtime.
    #[error("connection error: {0}")]
    Connection(String),

    /// An `error` frame sent by the server. The connection stays open.
    #[error("server error{}: {message}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Server {
        code: Option<String>,
        message: String,
    },

    /// The reconnection ceiling was reached; no further automatic attempts.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

impl ChatError {
    /// Only `ReconnectExhausted` leaves the session without automatic recovery.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. })
    }

    /// Classification of a server error code, if this is a server error.
    pub fn server_code(&self) -> Option<ServerErrorCode> {
        match self {
            Self::Server {
                code: Some(code), ..
            } => Some(ServerErrorCode::parse(code)),
            _ => None,
        }
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::InvalidMessage(_) => "invalid_message",
            Self::Endpoint(_) => "endpoint",
            Self::Decode(_) => "decode_error",
            Self::Connection(_) => "connection_error",
            Self::Server { .. } => "server_error",
            Self::ReconnectExhausted { .. } => "reconnect_exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display_includes_code_when_present() {
        let err = ChatError::Server {
            code: Some("LLM_ERROR".into()),
            message: "Failed to generate response".into(),
        };
        assert_eq!(
            err.to_string(),
            "server error [LLM_ERROR]: Failed to generate response"
        );

        let err = ChatError::Server {
            code: None,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "server error: boom");
    }

    #[test]
    fn only_exhaustion_is_terminal() {
        assert!(ChatError::ReconnectExhausted { attempts: 5 }.is_terminal());
        assert!(!ChatError::NotConnected.is_terminal());
        assert!(!ChatError::Connection("reset".into()).is_terminal());
    }

    #[test]
    fn decode_error_converts() {
        let err: ChatError = DecodeError::new("missing type").into();
        assert_eq!(err.kind(), "decode_error");
        assert_eq!(err.to_string(), "decode error: missing type");
    }

    #[test]
    fn server_code_is_classified() {
        let err = ChatError::Server {
            code: Some("ACCESS_DENIED".into()),
            message: "Conversation not found or access denied".into(),
        };
        assert_eq!(err.server_code(), Some(ServerErrorCode::AccessDenied));
        assert_eq!(ChatError::NotConnected.server_code(), None);
    }
}
