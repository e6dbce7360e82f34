//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, auth, upload and streaming sections. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub streaming: StreamingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.server.db_path.parent() == Some(self.server.content_root.as_path()) {
            warnings.push(
                "server.db_path lives inside server.content_root; keep metadata and artifacts apart"
                    .into(),
            );
        }

        if self.auth.enabled && self.auth.tokens.is_empty() && self.auth.trusted_header.is_none()
        {
            warnings.push(
                "auth is enabled but neither tokens nor trusted_header is set; every request will be rejected"
                    .into(),
            );
        }

        for (i, token) in self.auth.tokens.iter().enumerate() {
            if token.token.is_empty() {
                warnings.push(format!("auth.tokens[{i}].token is empty"));
            }
            if token.username.is_empty() {
                warnings.push(format!("auth.tokens[{i}].username is empty"));
            }
        }

        if self.upload.idle_timeout_secs == 0 {
            warnings.push("upload.idle_timeout_secs is 0; uploads will time out immediately".into());
        }

        if let Some(quota) = self.upload.max_storage_bytes {
            if quota < self.upload.max_upload_bytes {
                warnings.push(format!(
                    "upload.max_storage_bytes ({quota}) is smaller than upload.max_upload_bytes ({})",
                    self.upload.max_upload_bytes
                ));
            }
        }

        if self.streaming.chunk_size == 0 {
            warnings.push("streaming.chunk_size is 0; the default of 64 KiB will be used".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server and storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub db_path: PathBuf,
    /// Directory holding artifact bytes, separate from the metadata store.
    pub content_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: None,
            db_path: PathBuf::from("./data/filecast.db"),
            content_root: PathBuf::from("./data/content"),
        }
    }
}

/// Identity verification settings.
///
/// Token issuance lives outside filecast; this section only tells the auth
/// middleware which already-issued credentials to trust.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub tokens: Vec<ApiToken>,
    /// Header carrying a username set by an upstream identity proxy.
    pub trusted_header: Option<String>,
}

/// A bearer token mapped to the identity it stands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Upload ingestion limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Seconds an upload may go without receiving a chunk.
    pub idle_timeout_secs: u64,
    pub max_upload_bytes: u64,
    /// Optional quota over the sum of all stored artifacts.
    pub max_storage_bytes: Option<u64>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30,
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            max_storage_bytes: None,
        }
    }
}

/// Delivery engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Read buffer size per response chunk.
    pub chunk_size: usize,
}

impl StreamingConfig {
    /// Chunk size with the zero case replaced by the default.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
