//! Error taxonomy for remote fetches and searches.

use thiserror::Error;

/// Classified failure of a remote fetch or search.
///
/// Every variant maps to a short, stable user-facing string via
/// [`SourceError::user_message`]; the `Display` form carries the detail for
/// logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Transport could not reach the server (offline, DNS, timeout).
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Payload did not match any known response shape.
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Server answered with a non-success status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Catch-all, also used for injected failures.
    #[error("{0}")]
    Message(String),
}

impl SourceError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::NetworkUnavailable(detail.into())
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::DecodeFailure(detail.into())
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// Stable, user-facing string. Short and neutral.
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkUnavailable(_) => "Network connection appears to be offline.".to_string(),
            Self::DecodeFailure(_) => "We couldn't read the server response.".to_string(),
            Self::HttpStatus(code) => format!("Server responded with status {}.", code),
            Self::Message(text) => text.clone(),
        }
    }
}
