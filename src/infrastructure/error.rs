//! Transport-level errors

use thiserror::Error;

/// Failure to reach a remote endpoint at all.
///
/// Distinct from a remote service rejecting a request, which arrives as a
/// normal response and is turned into an [`crate::api::ApiError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("cannot build HTTP client: {message}")]
    Build { message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl TransportError {
    pub fn request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
