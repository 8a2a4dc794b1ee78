//! Transport-level errors for the assistant and sync endpoints.

use thiserror::Error;

/// Errors from outbound HTTP, including mid-stream failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be sent or the connection broke.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; the body text is surfaced verbatim to the user.
    #[error("server error: {status} {body}")]
    Status { status: u16, body: String },

    /// The streamed body failed after it started.
    #[error("response stream interrupted: {0}")]
    Interrupted(String),

    /// The request was cancelled locally (navigation, manual stop).
    #[error("request aborted")]
    Aborted,
}

impl TransportError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Interrupted(_) => true,
            Self::Aborted => false,
        }
    }

    /// Terminal error text rendered into the assistant bubble so the
    /// transcript always ends the turn with a visible response.
    pub fn display_text(&self) -> String {
        match self {
            Self::Status { status, body } => format!("Server error: {status} {body}"),
            Self::Aborted => "Response interrupted.".to_string(),
            other => format!("Network error: {other}"),
        }
    }
}
