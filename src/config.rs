//! Configuration file parser for ~/.config/taxon/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Env var that overrides `api_token`.
pub const TOKEN_ENV_VAR: &str = "TAXON_API_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks `api_token`.
#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the category API (the part before `/categories`).
    pub api_base_url: String,

    /// Bearer token. `TAXON_API_TOKEN` takes precedence.
    #[serde(deserialize_with = "secret_string")]
    pub api_token: Option<SecretString>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest image file accepted by the form.
    pub max_image_bytes: u64,

    /// Largest response body read from the API.
    pub max_response_bytes: usize,

    /// Where preview files are written. Defaults to a directory under the
    /// system temp dir.
    pub preview_dir: Option<PathBuf>,

    /// Also hide the edited category's descendants from the parent picker.
    pub exclude_descendants_from_parents: bool,

    /// Overrides for user-facing strings, keyed by message key.
    pub messages: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            request_timeout_secs: 20,
            max_image_bytes: 5 * 1024 * 1024,
            max_response_bytes: 5 * 1024 * 1024,
            preview_dir: None,
            exclude_descendants_from_parents: false,
            messages: HashMap::new(),
        }
    }
}

/// SEC-015: Mask api_token in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("preview_dir", &self.preview_dir)
            .field(
                "exclude_descendants_from_parents",
                &self.exclude_descendants_from_parents,
            )
            .field("messages", &self.messages.len())
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "api_base_url",
        "api_token",
        "request_timeout_secs",
        "max_image_bytes",
        "max_response_bytes",
        "preview_dir",
        "exclude_descendants_from_parents",
        "messages",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
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
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse TOML text. Empty or whitespace-only text yields defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(api_base_url = %config.api_base_url, "Loaded configuration");
        Ok(config)
    }

    /// Bearer token to send: the env var wins over the file.
    pub fn resolve_token(&self, env_value: Option<String>) -> Option<SecretString> {
        env_value
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .or_else(|| {
                self.api_token
                    .as_ref()
                    .map(|t| t.expose_secret())
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| SecretString::from(t.to_string()))
            })
    }

    /// Directory for preview files.
    pub fn preview_dir(&self) -> PathBuf {
        self.preview_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("taxon-previews"))
    }
}

/// Read a token straight into a `SecretString` so the plain `String` never
/// outlives deserialization.
fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

// ============================================================================
// Tests
// ============================================================================
