//! imagechat configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main imagechat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Session persistence configuration
    pub storage: StorageConfig,

    /// Per-session behaviour
    pub session: SessionConfig,

    /// Image CDN configuration
    pub imagekit: ImageKitConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the LLM API key environment variable is set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .imagechat.yml
        let local_config = PathBuf::from(".imagechat.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/imagechat/imagechat.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed: a broken config file is reported later by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = [
            config_path.cloned(),
            Some(PathBuf::from(".imagechat.yml")),
            user_config_path(),
        ];

        candidates
            .into_iter()
            .flatten()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("imagechat").join("imagechat.yml"))
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("gemini" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Sampling temperature; kept low so output stays close to the vocabulary
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            timeout_ms: 60_000,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the session database
    #[serde(rename = "db-dir")]
    pub db_dir: PathBuf,

    /// Upper bound on open database connections
    #[serde(rename = "max-connections")]
    pub max_connections: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/imagechat on Linux)
        let db_dir = dirs::data_local_dir()
            .map(|d| d.join("imagechat"))
            .unwrap_or_else(|| PathBuf::from(".imagechat"));

        Self {
            db_dir,
            max_connections: 10,
        }
    }
}

/// Per-session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet interval before a pending save is written
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// Maximum undo snapshots kept per session (unset = unbounded)
    #[serde(rename = "max-undo-depth")]
    pub max_undo_depth: Option<usize>,

    /// Wait hint reported on rate limits when the provider gives none
    #[serde(rename = "rate-limit-retry-secs")]
    pub rate_limit_retry_secs: u64,
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn rate_limit_retry(&self) -> Duration {
        Duration::from_secs(self.rate_limit_retry_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            max_undo_depth: None,
            rate_limit_retry_secs: 20,
        }
    }
}

/// Image CDN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageKitConfig {
    /// URL endpoint images are served from
    #[serde(rename = "url-endpoint")]
    pub url_endpoint: String,

    /// Direct upload API URL
    #[serde(rename = "upload-url")]
    pub upload_url: String,

    /// Environment variable containing the public key
    #[serde(rename = "public-key-env")]
    pub public_key_env: String,

    /// Environment variable containing the private key
    #[serde(rename = "private-key-env")]
    pub private_key_env: String,

    /// Lifetime of upload credentials in seconds
    #[serde(rename = "token-ttl-secs")]
    pub token_ttl_secs: u64,
}

impl Default for ImageKitConfig {
    fn default() -> Self {
        Self {
            url_endpoint: "https://ik.imagekit.io/demo".to_string(),
            upload_url: "https://upload.imagekit.io/api/v1/files/upload".to_string(),
            public_key_env: "IMAGEKIT_PUBLIC_KEY".to_string(),
            private_key_env: "IMAGEKIT_PRIVATE_KEY".to_string(),
            token_ttl_secs: 1800,
        }
    }
}
