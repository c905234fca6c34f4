use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Stream ended with {pending_bytes} byte(s) of an incomplete UTF-8 sequence")]
    DecodeIntegrity { pending_bytes: usize },

    #[error("Undelimited frame exceeded {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl StreamError {
    /// Whether the failure came from the network side rather than the byte content
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StreamError::Transport(_) | StreamError::UpstreamStatus { .. }
        )
    }
}

/// A single frame (or prefixed line) whose payload is not valid JSON.
///
/// Recovered inside the session; never surfaced to the consumer.
#[derive(Error, Debug)]
#[error("Malformed frame payload {line:?}: {source}")]
pub struct FramePayloadError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

pub type Result<T> = std::result::Result<T, StreamError>;
