//! Error Types
//!
//! Three layers, matching where a failure originates:
//!
//! - [`BackendError`]: the transport (HTTP status, network, body stream)
//! - [`SessionError`]: a request the session state machine refuses
//! - [`StudioError`]: what a generation or revision cycle returns
//!
//! Malformed event records are not errors at all; the extractor logs and
//! skips them.

use std::time::Duration;

use thiserror::Error;

use crate::messages::Status;

/// Failures talking to the generation backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered with a non-success status before streaming began
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Could not reach the backend
    #[error("network error: {0}")]
    Network(String),

    /// The response body failed mid-stream
    #[error("stream error: {0}")]
    Stream(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    Build(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Build(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Stream(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Requests the session state machine refuses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A cycle is already in flight
    #[error("a request is already in flight (status: {status})")]
    Busy {
        /// The busy status
        status: Status,
    },

    /// The action is not allowed from the current status
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// Current status
        from: Status,
        /// What was attempted
        action: &'static str,
    },

    /// The prompt is empty or whitespace
    #[error("prompt is empty")]
    EmptyPrompt,

    /// The prompt exceeds the configured limit
    #[error("prompt is {len} bytes (max: {max})")]
    PromptTooLarge {
        /// Prompt length in bytes
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

/// Failures of a generation or revision cycle
#[derive(Debug, Error)]
pub enum StudioError {
    /// The session refused the request; nothing was sent
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The backend failed before or during streaming
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No data arrived within the idle timeout
    #[error("no data from backend for {0:?}")]
    IdleTimeout(Duration),

    /// The cycle was cancelled by the caller
    #[error("request cancelled")]
    Cancelled,
}

impl StudioError {
    /// Whether the session was rolled back and can take a new request
    ///
    /// `Session` errors are refused up front and leave the session untouched.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Session(_))
    }

    /// Short user-facing description
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Session(e) => e.to_string(),
            Self::Backend(BackendError::Status { status, .. }) => {
                format!("The code generator rejected the request (HTTP {status}). Try again.")
            }
            Self::Backend(BackendError::Network(_)) => {
                "Could not reach the code generator. Check the endpoint and try again.".to_string()
            }
            Self::Backend(e) => format!("Generation failed: {e}"),
            Self::IdleTimeout(after) => {
                format!("The code generator stopped responding ({}s). Try again.", after.as_secs())
            }
            Self::Cancelled => "Request cancelled.".to_string(),
        }
    }
}
