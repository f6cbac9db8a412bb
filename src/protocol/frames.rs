//! Frame types and JSON encoding for the chat protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Frames sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// User content for a conversation.
    Message {
        conversation_id: String,
        content: String,
    },
    /// Heartbeat probe.
    Ping,
}

impl ClientFrame {
    pub fn message(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Message {
            conversation_id: conversation_id.into(),
            content: content.into(),
        }
    }
}

/// Frame kinds this client understands from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFrameType {
    /// Fragment of a streaming reply.
    Token,
    /// Terminal marker for the current reply.
    Complete,
    /// Failure signal.
    Error,
    /// Heartbeat acknowledgment.
    Pong,
}

impl ServerFrameType {
    /// Map a wire `type` string to a known kind. Unknown kinds yield `None`.
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "token" => Some(Self::Token),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            "pong" => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Pong => "pong",
        }
    }
}

/// Frames sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Token {
        content: String,
    },
    Complete {
        message_id: String,
        conversation_id: String,
    },
    Error {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
    Pong,
}

impl ServerFrame {
    pub fn frame_type(&self) -> ServerFrameType {
        match self {
            Self::Token { .. } => ServerFrameType::Token,
            Self::Complete { .. } => ServerFrameType::Complete,
            Self::Error { .. } => ServerFrameType::Error,
            Self::Pong => ServerFrameType::Pong,
        }
    }
}

/// Serialize a client frame to its JSON text form.
pub fn encode_client_frame(frame: &ClientFrame) -> Result<String, String> {
    serde_json::to_string(frame).map_err(|e| e.to_string())
}

/// Parse one inbound text frame.
///
/// Returns `Ok(None)` for a well-formed frame of a kind this client does not
/// know. Invalid JSON, a non-object, a missing or non-string `type`, or a
/// known kind with the wrong fields are all decode errors.
pub fn decode_server_frame(text: &str) -> Result<Option<ServerFrame>, DecodeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::new(format!("invalid JSON: {e}")))?;

    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(DecodeError::new("`type` is not a string")),
            None => return Err(DecodeError::new("missing `type` field")),
        },
        _ => return Err(DecodeError::new("frame is not a JSON object")),
    };

    let Some(frame_type) = ServerFrameType::from_wire(&kind) else {
        return Ok(None);
    };

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| DecodeError::new(format!("malformed `{}` frame: {e}", frame_type.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_frame_has_exact_wire_shape() {
        let text = encode_client_frame(&ClientFrame::message("c1", "hi")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"type": "message", "conversation_id": "c1", "content": "hi"})
        );
    }

    #[test]
    fn ping_frame_has_no_payload() {
        let text = encode_client_frame(&ClientFrame::Ping).unwrap();
        assert_eq!(text, r#"{"type":"ping"}"#);
    }

    #[test]
    fn decodes_every_known_kind() {
        assert_eq!(
            decode_server_frame(r#"{"type":"token","content":"Hel"}"#).unwrap(),
            Some(ServerFrame::Token {
                content: "Hel".into()
            })
        );
        assert_eq!(
            decode_server_frame(r#"{"type":"complete","message_id":"m1","conversation_id":"c1"}"#)
                .unwrap(),
            Some(ServerFrame::Complete {
                message_id: "m1".into(),
                conversation_id: "c1".into(),
            })
        );
        assert_eq!(
            decode_server_frame(r#"{"type":"error","message":"Invalid message format","code":"INVALID_FORMAT"}"#)
                .unwrap(),
            Some(ServerFrame::Error {
                message: "Invalid message format".into(),
                code: Some("INVALID_FORMAT".into()),
            })
        );
        assert_eq!(
            decode_server_frame(r#"{"type":"pong"}"#).unwrap(),
            Some(ServerFrame::Pong)
        );
    }

    #[test]
    fn error_code_is_optional_and_nullable() {
        let missing = decode_server_frame(r#"{"type":"error","message":"x"}"#).unwrap();
        let null = decode_server_frame(r#"{"type":"error","message":"x","code":null}"#).unwrap();
        let expected = Some(ServerFrame::Error {
            message: "x".into(),
            code: None,
        });
        assert_eq!(missing, expected);
        assert_eq!(null, expected);
    }

    #[test]
    fn token_content_is_passed_through_verbatim() {
        let frame = decode_server_frame(r#"{"type":"token","content":"  \né "}"#).unwrap();
        assert_eq!(
            frame,
            Some(ServerFrame::Token {
                content: "  \n\u{e9} ".into()
            })
        );
    }

    #[test]
    fn unknown_kind_is_ignored() {
        assert_eq!(
            decode_server_frame(r#"{"type":"typing","user":"u1"}"#).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_frames_are_decode_errors() {
        assert!(decode_server_frame("not json").is_err());
        assert!(decode_server_frame("[1,2,3]").is_err());
        assert!(decode_server_frame(r#"{"content":"x"}"#).is_err());
        assert!(decode_server_frame(r#"{"type":7}"#).is_err());
        // known kind, wrong field type
        let err = decode_server_frame(r#"{"type":"token","content":42}"#).unwrap_err();
        assert!(err.reason.contains("token"));
        // known kind, missing field
        assert!(decode_server_frame(r#"{"type":"complete","message_id":"m1"}"#).is_err());
    }

    #[test]
    fn frame_type_round_trips_through_wire_name() {
        for kind in [
            ServerFrameType::Token,
            ServerFrameType::Complete,
            ServerFrameType::Error,
            ServerFrameType::Pong,
        ] {
            assert_eq!(ServerFrameType::from_wire(kind.as_str()), Some(kind));
        }
    }
}
