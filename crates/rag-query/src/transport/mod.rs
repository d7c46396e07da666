//! Transport layer: resilient HTTP calls to the AI services
//!
//! Every adapter goes through [`ResilientClient`]. It retries connection
//! failures, timeouts and the configured transient statuses with exponential
//! backoff, honours `Retry-After`, and otherwise hands the last error back.
//! Whether a failure is fatal is decided by the pipeline, not here.

pub mod client;
pub mod policy;

pub use client::ResilientClient;
pub use policy::{parse_retry_after, RetryPolicy};

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of one outbound call
#[derive(Debug, Error)]
pub enum CallError {
    /// TCP/TLS connection could not be established
    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read phase exceeded its timeout
    #[error("request to {url} timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server replied with a non-success status
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// Any other client-side request failure
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Success status but the body was not JSON
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl CallError {
    /// Classify a reqwest send error
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            CallError::Timeout { url, source }
        } else if source.is_connect() {
            CallError::Connect { url, source }
        } else {
            CallError::Request { url, source }
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh attempt may succeed: connection failures, timeouts
    /// and any status listed in `retry_statuses`
    pub fn is_transient(&self, retry_statuses: &[u16]) -> bool {
        match self {
            CallError::Connect { .. } | CallError::Timeout { .. } => true,
            CallError::Status { status, .. } => retry_statuses.contains(&status.as_u16()),
            CallError::Request { .. } | CallError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> CallError {
        CallError::Status {
            url: "http://svc/x".to_string(),
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn only_listed_statuses_are_transient() {
        let listed = [429, 503];
        assert!(status(503).is_transient(&listed));
        assert!(!status(500).is_transient(&listed));
        assert!(!status(404).is_transient(&listed));
    }

    #[test]
    fn status_accessor() {
        assert_eq!(status(502).status(), Some(StatusCode::BAD_GATEWAY));
        assert!(status(502).is_transient(&[502]));
        assert!(status(502).to_string().contains("HTTP 502"));
    }
}
