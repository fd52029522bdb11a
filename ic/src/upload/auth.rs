//! Short-lived upload credentials
//!
//! The signature is the hex HMAC-SHA1 of `token + expire` keyed with the
//! private key; the private key itself never leaves the server.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::time::Duration;
use tracing::debug;

use super::UploadError;
use crate::config::ImageKitConfig;

type HmacSha1 = Hmac<Sha1>;

/// What a client needs to upload directly to the CDN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredentials {
    pub token: String,
    /// Unix seconds after which the credentials are rejected
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
}

/// Issues upload credentials from the server-side key pair
#[derive(Clone)]
pub struct UploadSigner {
    public_key: String,
    private_key: String,
    ttl: Duration,
}

impl std::fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSigner")
            .field("public_key", &self.public_key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl UploadSigner {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            ttl,
        }
    }

    /// Read the key pair from the environment variables named in config
    pub fn from_config(config: &ImageKitConfig) -> Result<Self, UploadError> {
        debug!("UploadSigner::from_config: called");
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| UploadError::NotConfigured(format!("{name} is not set")))
        };
        let public_key = read(&config.public_key_env)?;
        let private_key = read(&config.private_key_env)?;
        Ok(Self::new(public_key, private_key, Duration::from_secs(config.token_ttl_secs)))
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Fresh credentials: random token, expiring `ttl` from now
    pub fn sign(&self) -> Result<UploadCredentials, UploadError> {
        let token = uuid::Uuid::new_v4().to_string();
        let expire = chrono::Utc::now().timestamp() + self.ttl.as_secs() as i64;
        self.sign_with(token, expire)
    }

    /// Credentials for an explicit token and expiry
    pub fn sign_with(&self, token: String, expire: i64) -> Result<UploadCredentials, UploadError> {
        debug!(%expire, "UploadSigner::sign_with: called");
        let signature = signature(&self.private_key, &format!("{token}{expire}"))?;
        Ok(UploadCredentials {
            token,
            expire,
            signature,
            public_key: self.public_key.clone(),
        })
    }
}

/// Hex HMAC-SHA1 of `message` under `key`
pub fn signature(key: &str, message: &str) -> Result<String, UploadError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| UploadError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
