use std::time::Duration;

/// Failures reported by a text generation backend.
///
/// Every variant is absorbed into a job's Failed state by the coordinator;
/// none of them is allowed to escape as a process-level error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Status { .. } => "status_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "other",
        }
    }

    /// Build an error from a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        Self::Status { status, body }
    }
}
