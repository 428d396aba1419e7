//! Error types for refscreen
//!
//! Centralized error handling using thiserror.
//!
//! The taxonomy splits into fatal startup errors (config, auth, unknown
//! review) and per-call errors that are retried up to a bound and then
//! recorded against the article rather than aborting the run.

use std::time::Duration;
use thiserror::Error;

/// All error types that can occur in refscreen
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Missing or invalid configuration (fatal, pre-run)
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid or expired platform session (fatal)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Review or article does not exist on the platform. Fatal when the
    /// review itself is unknown at snapshot fetch; an article-level 404
    /// mid-run is a per-article failure like any other
    #[error("Not found: {0}")]
    NotFound(String),

    /// Classifier response could not be mapped to a decision
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Service rejected the request as malformed (deterministic non-auth
    /// 4xx); repeating the identical request cannot succeed
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// HTTP 429 from either service
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Network failure, 5xx, or per-call timeout
    #[error("Transient error: {0}")]
    Transient(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScreenError {
    /// Whether the bounded retry policy should re-attempt this error.
    ///
    /// Classifier errors are retryable: a fresh model call may produce a
    /// parseable response even when the previous one did not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScreenError::Classifier(_) | ScreenError::RateLimited { .. } | ScreenError::Transient(_)
        )
    }

    /// Whether this error makes the run as a whole unable to proceed.
    ///
    /// NotFound is deliberately absent: an unknown review is fatal, but
    /// that case surfaces from the snapshot fetch before any article is
    /// processed. A 404 on a single article mid-run must not stop the
    /// remaining articles.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScreenError::Config(_) | ScreenError::Auth(_))
    }
}

// All reqwest failures (connect, timeout, body read) are transport-level
// and therefore transient for retry purposes.
impl From<reqwest::Error> for ScreenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScreenError::Transient(format!("request timed out: {}", err))
        } else {
            ScreenError::Transient(format!("network error: {}", err))
        }
    }
}

/// Result type alias for refscreen operations
pub type Result<T> = std::result::Result<T, ScreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ScreenError::Config("REVIEW_ID not set".to_string());
        assert_eq!(err.to_string(), "Config error: REVIEW_ID not set");
    }

    #[test]
    fn test_auth_error_display() {
        let err = ScreenError::Auth("session expired".to_string());
        assert_eq!(err.to_string(), "Authentication failed: session expired");
    }

    #[test]
    fn test_rate_limited_display() {
        let err = ScreenError::RateLimited {
            retry_after: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ScreenError::Classifier("garbage response".into()).is_retryable());
        assert!(
            ScreenError::RateLimited {
                retry_after: Duration::from_secs(5)
            }
            .is_retryable()
        );
        assert!(ScreenError::Transient("connection reset".into()).is_retryable());

        assert!(!ScreenError::Config("missing".into()).is_retryable());
        assert!(!ScreenError::Auth("expired".into()).is_retryable());
        assert!(!ScreenError::NotFound("review 42".into()).is_retryable());
        assert!(!ScreenError::Rejected("bad request body".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ScreenError::Config("missing".into()).is_fatal());
        assert!(ScreenError::Auth("expired".into()).is_fatal());

        // A missing article mid-run must not stop the rest of the snapshot
        assert!(!ScreenError::NotFound("article 42".into()).is_fatal());
        assert!(!ScreenError::Rejected("bad request body".into()).is_fatal());
        assert!(!ScreenError::Classifier("bad".into()).is_fatal());
        assert!(!ScreenError::Transient("reset".into()).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScreenError = io_err.into();
        assert!(matches!(err, ScreenError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ScreenError = json_err.into();
        assert!(matches!(err, ScreenError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(ScreenError::Transient("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
