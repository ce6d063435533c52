//! Error handling for direct-to-storage uploads
//!
//! Every failure a session can hit is one variant of [`UploadError`]. The
//! `Display` output of the protocol variants is the exact message handed to
//! the `on_error` callback.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;

/// Error types that can occur while authorizing or transferring a file
#[derive(Error, Debug)]
pub enum UploadError {
    /// Neither a credentialed nor a legacy cross-origin transport is available
    #[error("CORS not supported")]
    CorsNotSupported,

    /// The signing server answered with something other than 200
    #[error("Could not contact request signing server. Status = {status}")]
    SigningTransport { status: u16 },

    /// The signing server answered 200 with a body that is not an authorization
    #[error("Invalid signing server response JSON: {body}")]
    SigningProtocol { body: String },

    /// The storage POST failed below HTTP
    #[error("XHR error.")]
    UploadTransport { reason: String },

    /// The storage POST completed with a non-200 status
    #[error("Upload error: {status}")]
    UploadStatus { status: u16 },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid parameter
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl UploadError {
    /// Create a new signing transport error
    pub fn signing_transport(status: u16) -> Self {
        UploadError::SigningTransport { status }
    }

    /// Create a new signing protocol error carrying the raw response body
    pub fn signing_protocol(body: impl Into<String>) -> Self {
        UploadError::SigningProtocol { body: body.into() }
    }

    /// Create a new upload transport error
    pub fn upload_transport(reason: impl Into<String>) -> Self {
        UploadError::UploadTransport {
            reason: reason.into(),
        }
    }

    /// Create a new upload status error
    pub fn upload_status(status: u16) -> Self {
        UploadError::UploadStatus { status }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        UploadError::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened while talking to the signing server
    pub fn is_signing_error(&self) -> bool {
        matches!(
            self,
            UploadError::SigningTransport { .. } | UploadError::SigningProtocol { .. }
        )
    }
}
