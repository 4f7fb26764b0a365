//! Error types and handling
//!
//! Every failure raised by the query client layer is a [`PuppetDbError`].
//! Transport and decode failures come from the wire, `NotFound` and
//! `Validation` are local policy decisions.

use thiserror::Error;

/// Query client error types
#[derive(Debug, Error)]
pub enum PuppetDbError {
    /// Non-success HTTP status or network failure (no response)
    #[error("{}", transport_display(.status, .status_text, .message))]
    Transport {
        /// HTTP status code, absent when no response was received
        status: Option<u16>,
        /// Canonical status text (e.g. "Bad Request")
        status_text: Option<String>,
        /// Response body verbatim, or the underlying cause for network failures
        message: String,
    },

    /// The query succeeded but the expected singleton was absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Locally detected bad input, raised before any network call
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Response body was not valid JSON or did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

fn transport_display(status: &Option<u16>, status_text: &Option<String>, message: &str) -> String {
    match (status, status_text) {
        (Some(code), Some(text)) if message.is_empty() => {
            format!("PuppetDB query failed: {} {}", code, text)
        }
        (Some(code), Some(text)) => {
            format!("PuppetDB query failed: {} {}: {}", code, text, message)
        }
        (Some(code), None) => format!("PuppetDB query failed: {}: {}", code, message),
        (None, _) => format!("PuppetDB request failed: {}", message),
    }
}

impl PuppetDbError {
    /// Build a transport error from a non-success HTTP response
    pub fn http_status(status: u16, status_text: Option<&str>, body: impl Into<String>) -> Self {
        PuppetDbError::Transport {
            status: Some(status),
            status_text: status_text.map(str::to_string),
            message: body.into(),
        }
    }

    /// Build a transport error for a request that never got a response
    pub fn network(cause: impl Into<String>) -> Self {
        PuppetDbError::Transport {
            status: None,
            status_text: None,
            message: cause.into(),
        }
    }

    /// Transport and decode failures are handled the same way by callers
    pub fn is_transport_like(&self) -> bool {
        matches!(self, PuppetDbError::Transport { .. } | PuppetDbError::Decode(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PuppetDbError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PuppetDbError::ValidationError(_))
    }

    /// The backend's own error text, preserved verbatim.
    ///
    /// For HTTP failures this is the response body when the service sent one,
    /// otherwise the status text. Other kinds return their message.
    pub fn backend_message(&self) -> String {
        match self {
            PuppetDbError::Transport {
                status_text,
                message,
                ..
            } => {
                if message.is_empty() {
                    status_text.clone().unwrap_or_default()
                } else {
                    message.clone()
                }
            }
            PuppetDbError::NotFound(msg)
            | PuppetDbError::ValidationError(msg)
            | PuppetDbError::Decode(msg) => msg.clone(),
        }
    }
}

impl From<serde_json::Error> for PuppetDbError {
    fn from(err: serde_json::Error) -> Self {
        PuppetDbError::Decode(err.to_string())
    }
}

/// Result type alias for query client operations
pub type Result<T> = std::result::Result<T, PuppetDbError>;
