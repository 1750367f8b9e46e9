//! Common error types for pixgate

use thiserror::Error;

/// Common result type for pixgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the upload and gallery workflows
///
/// None of these are fatal. Callers surface them as transient notices and
/// the user retries by re-selecting files or re-submitting.
#[derive(Error, Debug)]
pub enum Error {
    /// No eligible (image-typed) files in a selection
    #[error("{0}")]
    Validation(String),

    /// Batch upload answered with a status other than 200
    #[error("Upload failed with status {status}")]
    Upload { status: u16, body: String },

    /// Read request answered with a non-success status
    #[error("Request to {url} failed with status {status}")]
    Http { status: u16, url: String },

    /// Transport-level failure, no response received
    #[error("Network error: {0}")]
    Network(String),

    /// Success response whose body could not be decoded
    #[error("Response parse error: {0}")]
    ResponseParse(String),

    /// A batch submission is already in flight
    #[error("An upload is already in progress")]
    UploadInProgress,

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short message suitable for a user-facing notice
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Upload { status, .. } => format!("Upload failed: status {}", status),
            Error::Http { status, .. } => format!("Could not load images: status {}", status),
            Error::Network(_) => "Could not reach the server (network error)".to_string(),
            Error::ResponseParse(_) => "Could not read the server response".to_string(),
            Error::UploadInProgress => "Please wait for the current upload to finish".to_string(),
            Error::Config(msg) => format!("Configuration error: {}", msg),
            Error::Io(err) => format!("File error: {}", err),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Upload { status, .. } | Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_carries_status() {
        let err = Error::Upload {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.user_message(), "Upload failed: status 500");
        assert_eq!(err.to_string(), "Upload failed with status 500");
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = Error::Network("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert!(err.user_message().contains("network error"));
    }
}
