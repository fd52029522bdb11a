//! Upload error types

use thiserror::Error;

/// Errors from signing or sending an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("ImageKit credentials not configured")]
    NotConfigured(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
