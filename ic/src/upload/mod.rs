//! Image upload: credential signing and the storage client

use async_trait::async_trait;

mod auth;
mod error;
mod imagekit;

pub use auth::{UploadCredentials, UploadSigner, signature};
pub use error::UploadError;
pub use imagekit::ImageKitUploader;

/// A stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Stable path under the CDN endpoint
    pub file_path: String,
    /// Full URL as reported by the storage service
    pub url: String,
}

/// Sends raw image bytes to external storage
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadedFile, UploadError>;
}
