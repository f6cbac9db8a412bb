//! Reassembly of streamed `token` fragments into one assistant reply.

/// A finished assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    pub message_id: String,
    pub conversation_id: String,
    pub content: String,
}

/// Accumulator for the reply currently being streamed.
///
/// `None` between turns. The first token of a turn creates it, `complete`
/// takes it, and an error or a lost connection discards it.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    current: Option<String>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the text accumulated so far.
    pub fn push_token(&mut self, fragment: &str) -> &str {
        let reply = self.current.get_or_insert_with(String::new);
        reply.push_str(fragment);
        reply
    }

    /// Finish the turn. A `complete` with no preceding tokens yields empty content.
    pub fn complete(
        &mut self,
        message_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> CompletedTurn {
        CompletedTurn {
            message_id: message_id.into(),
            conversation_id: conversation_id.into(),
            content: self.current.take().unwrap_or_default(),
        }
    }

    /// Drop the in-progress reply, returning it if there was one.
    pub fn discard(&mut self) -> Option<String> {
        self.current.take()
    }

    pub fn is_streaming(&self) -> bool {
        self.current.is_some()
    }

    pub fn partial(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
