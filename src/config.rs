//! Configuration file parser for retell-sync.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `service_token` to prevent secret leakage in
/// logs, error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the API server binds to.
    pub bind: String,

    /// Port the API server listens on.
    pub port: u16,

    /// Path to the SQLite database file.
    pub database_path: String,

    /// Directory re-hosted cover images are written to.
    pub media_dir: String,

    /// Public base URL under which `media_dir` is served.
    pub public_base_url: String,

    /// Per-request timeout for feed and image fetches, in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum accepted feed document size in bytes.
    pub max_feed_bytes: usize,

    /// Maximum accepted image size in bytes.
    pub max_image_bytes: usize,

    /// Admit localhost and private-range feed/image hosts. Off by default;
    /// for deployments syncing from inside their own network.
    pub allow_private_hosts: bool,

    /// Bearer token for the platform-wide sync endpoint (alternative to
    /// the RETELL_SERVICE_TOKEN env var). Env var takes precedence.
    /// Unset means platform sync is disabled.
    pub service_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8787,
            database_path: "retell.db".to_string(),
            media_dir: "media".to_string(),
            public_base_url: "http://localhost:8787/media".to_string(),
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            max_image_bytes: 5 * 1024 * 1024,
            allow_private_hosts: false,
            service_token: None,
        }
    }
}

/// Mask service_token in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("media_dir", &self.media_dir)
            .field("public_base_url", &self.public_base_url)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_feed_bytes", &self.max_feed_bytes)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("allow_private_hosts", &self.allow_private_hosts)
            .field(
                "service_token",
                &self.service_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "bind",
                "port",
                "database_path",
                "media_dir",
                "public_base_url",
                "fetch_timeout_secs",
                "max_feed_bytes",
                "max_image_bytes",
                "allow_private_hosts",
                "service_token",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), port = config.port, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
