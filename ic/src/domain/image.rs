//! Image references
//!
//! The subject image is either hosted on the CDN (and so transformable by
//! URL), hosted somewhere else, or only held locally as a preview.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CDN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://ik\.imagekit\.io/[^/]+)(/.*)?$").expect("CDN url pattern is valid"));

/// The active image of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Stored on the CDN: URL transformations apply
    Remote { endpoint: String, path: String },
    /// Some other absolute URL: displayable, not transformable
    External(String),
    /// A `data:` URL held before (or instead of) a successful upload
    LocalPreview(String),
}

impl ImageReference {
    /// Interpret a stored image string
    ///
    /// Bare paths are resolved against `default_endpoint`. Blank input means
    /// no image.
    pub fn parse(raw: &str, default_endpoint: &str) -> Option<Self> {
        debug!(raw_len = raw.len(), "ImageReference::parse: called");
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with("data:") {
            debug!("ImageReference::parse: local preview");
            return Some(Self::LocalPreview(raw.to_string()));
        }

        if let Some(caps) = CDN_URL.captures(raw) {
            debug!("ImageReference::parse: CDN url");
            let endpoint = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let path = caps.get(2).map_or("/", |m| m.as_str()).to_string();
            return Some(Self::Remote { endpoint, path });
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            debug!("ImageReference::parse: external url");
            return Some(Self::External(raw.to_string()));
        }

        debug!("ImageReference::parse: bare path on default endpoint");
        Some(Self::remote(default_endpoint, raw))
    }

    /// A CDN-hosted file at `path` under `endpoint`
    pub fn remote(endpoint: &str, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self::Remote {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            path,
        }
    }

    /// Build a local preview from raw file bytes
    pub fn local_preview(mime: &str, bytes: &[u8]) -> Self {
        debug!(%mime, len = bytes.len(), "ImageReference::local_preview: called");
        Self::LocalPreview(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Whether URL transformations can be applied to this image
    pub fn is_transformable(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// The string persisted as the session's `imageUrl`
    pub fn to_stored(&self) -> String {
        match self {
            Self::Remote { endpoint, path } => format!("{endpoint}{path}"),
            Self::External(url) | Self::LocalPreview(url) => url.clone(),
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalPreview(url) => write!(f, "local preview ({} bytes)", url.len()),
            other => write!(f, "{}", other.to_stored()),
        }
    }
}

/// Guess an image MIME type from a file name
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
