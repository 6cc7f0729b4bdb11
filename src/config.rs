//! Configuration file parser for ~/.config/webrss/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings so typos are
//! visible.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::api::ClientOptions;

/// Environment variable that overrides `password` from the file.
pub const PASSWORD_ENV: &str = "WEBRSS_PASSWORD";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level client configuration.
///
/// Every key is optional. `Debug` masks the password.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the webrss server, e.g. `https://rss.example.org/`.
    pub base_url: String,

    /// Login name. No login is attempted without both username and password.
    pub username: Option<String>,

    /// Login password. `WEBRSS_PASSWORD` takes precedence.
    pub password: Option<String>,

    /// Seconds between category refreshes.
    pub poll_interval_secs: u64,

    pub request_timeout_secs: u64,

    /// Retries for failed GET requests (writes are never retried).
    pub max_retries: u32,

    /// Permit sending credentials over plain http to a non-local host.
    pub allow_insecure: bool,

    /// Keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            username: None,
            password: None,
            poll_interval_secs: 60,
            request_timeout_secs: 30,
            max_retries: 2,
            allow_insecure: false,
            keybindings: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("allow_insecure", &self.allow_insecure)
            .field("keybindings", &self.keybindings)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "base_url",
        "username",
        "password",
        "poll_interval_secs",
        "request_timeout_secs",
        "max_retries",
        "allow_insecure",
        "keybindings",
    ];

    /// `~/.config/webrss/config.toml`, or None when `HOME` is unset.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("webrss")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Password to log in with: the environment override if set and
    /// non-empty, otherwise the file's value.
    pub fn resolved_password(&self) -> Option<SecretString> {
        self.password_with_override(std::env::var(PASSWORD_ENV).ok())
    }

    fn password_with_override(&self, env: Option<String>) -> Option<SecretString> {
        env.filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
            .map(SecretString::from)
    }

    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(String, SecretString)> {
        let username = self.username.clone().filter(|u| !u.trim().is_empty())?;
        Some((username, self.resolved_password()?))
    }

    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            max_retries: self.max_retries,
            allow_insecure: self.allow_insecure,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
