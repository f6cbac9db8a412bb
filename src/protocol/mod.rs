//! Wire protocol for the `/ws/chat` streaming channel.
//!
//! Frames are JSON objects sent as WebSocket text messages. Every frame
//! carries a `type` field used for dispatch.
//!
//! ## Client → server
//!
//! - `message`: `{ "type": "message", "conversation_id": "...", "content": "..." }`
//! - `ping`: `{ "type": "ping" }`
//!
//! ## Server → client
//!
//! - `token`: one fragment of the streamed reply
//! - `complete`: end of one reply, with the stored message id
//! - `error`: failure report with an optional code
//! - `pong`: heartbeat acknowledgment
//!
//! ## Forward compatibility
//!
//! Frames whose `type` is not one of the above are ignored rather than
//! reported, so newer servers can add kinds without breaking this client.

pub mod codes;
pub mod frames;

pub use codes::ServerErrorCode;
pub use frames::{
    ClientFrame, ServerFrame, ServerFrameType, decode_server_frame, encode_client_frame,
};
