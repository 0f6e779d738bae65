//! Error type shared by all engine ports.
//!
//! Every variant is classified as transient or permanent through
//! [`PortError::is_retryable`]; the job queue uses that classification to
//! decide between backing off and dead-lettering.

use thiserror::Error;

/// Errors an external engine (ASR / MT / TTS) can report through a port.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    /// HTTP transport or connection error.
    #[error("engine request failed: {0}")]
    Request(String),

    /// The engine did not answer within its own request timeout.
    #[error("engine request timed out")]
    Timeout,

    /// The engine is throttling us.
    #[error("engine rate limit exceeded")]
    RateLimited,

    /// The engine answered with an error status not covered above.
    #[error("engine returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The input cannot be processed by this engine (bad audio format,
    /// empty text, ...).
    #[error("invalid engine input: {0}")]
    InvalidInput(String),

    /// The engine does not support the requested language.
    #[error("engine does not support language {0:?}")]
    UnsupportedLanguage(String),

    /// The engine response could not be decoded.
    #[error("failed to parse engine response: {0}")]
    Parse(String),

    /// The engine answered successfully but without usable content.
    #[error("engine returned an empty response")]
    EmptyResponse,
}

impl PortError {
    /// Map an HTTP error status to a port error.
    ///
    /// 408, 429 and 5xx are transient; every other status is permanent.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            408 => PortError::Timeout,
            429 => PortError::RateLimited,
            _ => PortError::Status {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortError::Request(_)
            | PortError::Timeout
            | PortError::RateLimited
            | PortError::EmptyResponse => true,
            PortError::Status { status, .. } => *status >= 500,
            PortError::InvalidInput(_) | PortError::UnsupportedLanguage(_) | PortError::Parse(_) => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for PortError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PortError::Timeout
        } else if let Some(status) = e.status() {
            PortError::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() {
            PortError::Parse(e.to_string())
        } else {
            PortError::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(PortError::Request("reset".into()).is_retryable());
        assert!(PortError::Timeout.is_retryable());
        assert!(PortError::RateLimited.is_retryable());
        assert!(PortError::EmptyResponse.is_retryable());
        assert!(PortError::from_status(503, "unavailable").is_retryable());
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!PortError::InvalidInput("empty".into()).is_retryable());
        assert!(!PortError::UnsupportedLanguage("xx".into()).is_retryable());
        assert!(!PortError::Parse("bad json".into()).is_retryable());
        assert!(!PortError::from_status(400, "bad request").is_retryable());
    }

    #[test]
    fn from_status_maps_throttling_and_timeouts() {
        assert_eq!(PortError::from_status(429, ""), PortError::RateLimited);
        assert_eq!(PortError::from_status(408, ""), PortError::Timeout);
        assert!(matches!(
            PortError::from_status(404, "not found"),
            PortError::Status { status: 404, .. }
        ));
    }

    #[test]
    fn display_includes_status() {
        let e = PortError::from_status(502, "bad gateway");
        assert_eq!(e.to_string(), "engine returned HTTP 502: bad gateway");
    }
}
