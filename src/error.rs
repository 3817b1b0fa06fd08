//! Error types for placebook operations.

use thiserror::Error;

/// The main error type for place operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No place exists with the requested id.
    #[error("place not found: {id}")]
    NotFound {
        /// The id that failed to resolve.
        id: String,
    },

    /// Uploading an image to the hosted media service failed.
    #[error("image upload failed: {0}")]
    Upload(anyhow::Error),

    /// A call to the hosted media service failed.
    #[error("media service error: {0}")]
    RemoteService(anyhow::Error),

    /// Writing the place collection back to disk failed.
    #[error("failed to persist place collection: {0}")]
    Persist(anyhow::Error),

    /// The request was missing a required field or carried an unusable body.
    #[error("bad request: {message}")]
    BadRequest {
        /// Description of what was wrong with the input.
        message: String,
    },
}

/// A specialized Result type for place operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a not-found error for the given place id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Check if this error should surface as a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("abc-123");
        assert_eq!(err.to_string(), "place not found: abc-123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_bad_request_display() {
        let err = Error::bad_request("missing title");
        assert!(err.to_string().contains("missing title"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_persist_display() {
        let err = Error::Persist(anyhow::anyhow!("disk full"));
        assert!(err.to_string().contains("persist"));
    }
}
