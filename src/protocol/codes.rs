/// Error codes the chat server is known to send in `error` frames.
///
/// The raw code string is always kept on the error itself; this is only a
/// classification for callers that want to branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorCode {
    /// The server could not parse or validate a client frame.
    InvalidFormat,
    /// The conversation does not exist or belongs to another user.
    AccessDenied,
    /// The model failed while generating the reply.
    LlmError,
    /// Unexpected server-side failure.
    InternalError,
    Other(String),
}

impl ServerErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "INVALID_FORMAT" => Self::InvalidFormat,
            "ACCESS_DENIED" => Self::AccessDenied,
            "LLM_ERROR" => Self::LlmError,
            "INTERNAL_ERROR" => Self::InternalError,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::LlmError => "LLM_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Other(code) => code,
        }
    }

    /// Whether resending the same message could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LlmError | Self::InternalError)
    }
}

impl std::fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
