use thiserror::Error;

/// Errors raised by a completion backend.
///
/// Inside the executor these are always absorbed into a failed `TaskResult`;
/// the message text is what ends up in `TaskResult::error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion service not configured: {0}")]
    NotConfigured(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("stream error: {0}")]
    Stream(String),
}

impl CompletionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Stream(_) => "stream",
        }
    }
}
