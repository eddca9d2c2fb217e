//! Client configuration.
//!
//! [`ClientConfig`] holds every runtime setting the connector needs.  It can
//! be built from defaults, loaded from a TOML file, and then overridden by
//! CLI flags in `main.rs`.
//!
//! ```toml
//! [server]
//! url = "https://website-portal.herokuapp.com"
//!
//! [portal]
//! platform = "linux"
//! name = "workstation"
//! token_hash = "bcrypt"     # or "argon2" for services that verify Argon2id
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field falls back to a default when absent, so an empty file is a
//! valid configuration.  Unknown keys in `[server]` are rejected: the channel
//! is never reopened after a loss, and there is no setting to change that.  Portal identities and secrets are never read from or
//! written to this file; they are supplied per invocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address of the public coordination service.
pub const DEFAULT_SERVER_URL: &str = "https://website-portal.herokuapp.com";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the coordination service lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Service address (`http`, `https`, `ws` or `wss`).
    #[serde(default = "default_server_url")]
    pub url: String,
}

/// Values used when registering a new portal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortalConfig {
    /// Platform tag sent with `register` (e.g. `"linux"`).
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Display name sent with `register`.
    #[serde(default = "default_name")]
    pub name: String,
    /// How the secret is hashed into the login token.
    #[serde(default)]
    pub token_hash: TokenHash,
}

/// Login token hashing scheme; must match what the service verifies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenHash {
    #[default]
    Bcrypt,
    Argon2,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_platform() -> String {
    std::env::consts::OS.to_string()
}
fn default_name() -> String {
    "portal".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            name: default_name(),
            token_hash: TokenHash::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
