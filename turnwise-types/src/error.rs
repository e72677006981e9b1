//! Error types shared by the turnwise crates.

use std::time::Duration;

/// Failures while opening a streamed call, before any event is decoded.
///
/// The first four variants are transient and retried with backoff; the rest
/// end the turn.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection could not be made or was reset.
    #[error("could not reach the backend: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// HTTP 429.
    #[error("backend rate limit hit (retry after {retry_after:?})")]
    RateLimit {
        /// From the `retry-after` header.
        retry_after: Option<Duration>,
    },
    /// Connecting took too long.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP 5xx or 529 overloaded.
    #[error("backend unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP 401 or 403, or an unusable key.
    #[error("backend rejected credentials: {0}")]
    Authentication(String),
    /// HTTP 400 and other 4xx the backend rejected.
    #[error("backend rejected request: {0}")]
    InvalidRequest(String),
    /// HTTP 404 for the configured model.
    #[error("unknown model: {0}")]
    ModelNotFound(String),
    /// The response body could not be read as a protocol stream.
    #[error("unreadable response body: {0}")]
    InvalidResponse(String),

    /// Anything not covered above; never retried.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Transient failures the retry policy may repeat.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimit { .. }
                | Self::Timeout(_)
                | Self::ServiceUnavailable(_)
        )
    }

    /// Server-suggested delay before the next attempt.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Fatal failures while decoding one streamed call.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The backend sent an `error` event.
    #[error("backend error ({kind}): {message}")]
    Remote {
        /// Backend error category.
        kind: String,
        /// Backend message.
        message: String,
    },
    /// Events arrived out of the expected order.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The stream ended before `message_stop`.
    #[error("stream ended before message_stop")]
    Truncated,
    /// Reading the stream failed mid-way.
    #[error("transport error: {0}")]
    Transport(#[from] ProviderError),
}

/// Errors from tool handlers. The dispatcher turns these into
/// `{success: false, error}` payloads.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No route is registered under this name.
    #[error("unknown tool: {0}")]
    NotFound(String),
    /// The tool is run by the backend and must never reach local dispatch.
    #[error("protocol violation: {0} is executed remotely and cannot be dispatched locally")]
    RemoteOnly(String),
    /// The tool exists but is not offered to the current agent.
    #[error("tool not available to this agent: {0}")]
    NotAllowed(String),
    /// Input did not deserialize into the handler arguments.
    #[error("bad tool input: {0}")]
    InvalidInput(String),
    /// The handler or its collaborator failed.
    #[error("tool failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The handler panicked.
    #[error("tool panicked: {0}")]
    Panicked(String),
}

/// Errors from the conversation store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No conversation with this id.
    #[error("conversation not found: {0}")]
    NotFound(String),
    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Backend storage failure.
    #[error("storage error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(ProviderError::Network(Box::new(io)).is_retryable());
        assert!(ProviderError::RateLimit { retry_after: None }.is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(ProviderError::ServiceUnavailable("overloaded".into()).is_retryable());
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!ProviderError::Authentication("bad key".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("bad".into()).is_retryable());
        assert!(!ProviderError::ModelNotFound("x".into()).is_retryable());
        assert!(!ProviderError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn retry_after_only_on_rate_limit() {
        let err = ProviderError::RateLimit {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(
            ProviderError::ServiceUnavailable("x".into()).retry_after(),
            None
        );
    }

    #[test]
    fn decode_error_messages() {
        let err = DecodeError::Remote {
            kind: "overloaded_error".into(),
            message: "Overloaded".into(),
        };
        assert_eq!(err.to_string(), "backend error (overloaded_error): Overloaded");
        assert_eq!(
            ToolError::NotFound("nope".into()).to_string(),
            "unknown tool: nope"
        );
    }
}
