//! Direct multipart upload to ImageKit

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{UploadError, UploadSigner, UploadedFile, Uploader};
use crate::config::ImageKitConfig;
use crate::domain::mime_for;

/// Upload request timeout
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Uploads files with freshly signed credentials
pub struct ImageKitUploader {
    http: Client,
    upload_url: String,
    signer: UploadSigner,
}

impl ImageKitUploader {
    pub fn new(upload_url: impl Into<String>, signer: UploadSigner) -> Result<Self, UploadError> {
        let http = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            http,
            upload_url: upload_url.into(),
            signer,
        })
    }

    pub fn from_config(config: &ImageKitConfig) -> Result<Self, UploadError> {
        debug!("ImageKitUploader::from_config: called");
        Self::new(config.upload_url.clone(), UploadSigner::from_config(config)?)
    }
}

#[async_trait]
impl Uploader for ImageKitUploader {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadedFile, UploadError> {
        debug!(%file_name, len = bytes.len(), "ImageKitUploader::upload: called");
        let creds = self.signer.sign()?;

        let file = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = Form::new()
            .part("file", file)
            .text("fileName", file_name.to_string())
            .text("publicKey", creds.public_key)
            .text("signature", creds.signature)
            .text("expire", creds.expire.to_string())
            .text("token", creds.token)
            .text("useUniqueFileName", "true");

        let response = self.http.post(&self.upload_url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "ImageKitUploader::upload: rejected");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        info!(file_path = %body.file_path, "Uploaded image");
        Ok(UploadedFile {
            file_path: body.file_path,
            url: body.url,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_path: String,
    url: String,
}
