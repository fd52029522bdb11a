//! LLM error types

use std::time::Duration;

/// Errors from an LLM provider call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Model unavailable ({status}): {message}")]
    ModelUnavailable { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out")]
    Timeout,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify a non-success HTTP status that will not be retried
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 | 503 => Self::ModelUnavailable { status, message },
            _ => Self::ApiError { status, message },
        }
    }

    /// Whether a caller may reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Network(_) | Self::ModelUnavailable { .. } => true,
            Self::ApiError { status, .. } => matches!(status, 408 | 500 | 502 | 504),
            _ => false,
        }
    }

    /// Wait hint given by the provider, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Check if an HTTP status code is worth retrying inside a client
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Parse a `retry-after` header value given in whole seconds
pub(crate) fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value.and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_unavailable() {
        assert!(matches!(
            LlmError::from_status(404, "no such model".to_string()),
            LlmError::ModelUnavailable { status: 404, .. }
        ));
        assert!(matches!(
            LlmError::from_status(503, String::new()),
            LlmError::ModelUnavailable { .. }
        ));
        assert!(matches!(LlmError::from_status(400, String::new()), LlmError::ApiError { .. }));
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let e = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(e.retry_after(), Some(Duration::from_secs(7)));
        assert!(e.is_retryable());
        assert_eq!(LlmError::Timeout.retry_after(), None);
        assert!(!LlmError::InvalidResponse("x".to_string()).is_retryable());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("30")), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
