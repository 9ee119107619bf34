//! TOML configuration for the `keyhook-monitor` host.
//!
//! The file is looked up in this order:
//! 1. an explicit path (the first command-line argument),
//! 2. the `KEYHOOK_CONFIG` environment variable,
//! 3. the platform config directory:
//!    - Windows: `%APPDATA%\keyhook\config.toml`
//!    - Linux:   `$XDG_CONFIG_HOME/keyhook/config.toml` or `~/.config/keyhook/config.toml`
//!    - macOS:   `~/Library/Application Support/keyhook/config.toml`
//!
//! ```toml
//! [monitor]
//! log_level = "info"
//! log_key_events = false
//!
//! [suppress]
//! keys = ["Ctrl+Alt+F12"]
//! ```
//!
//! A missing file yields [`MonitorConfig::default()`]. Fields absent from the
//! file take their defaults, so older files keep loading as options are added.

use std::path::{Path, PathBuf};

use keyhook_core::Keys;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "KEYHOOK_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed, including invalid key chords.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level monitor configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub suppress: SuppressSection,
}

/// Logging behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSection {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log every dispatched key at debug level.
    #[serde(default)]
    pub log_key_events: bool,
}

/// Key chords swallowed system-wide.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuppressSection {
    /// Chords such as `"Ctrl+Alt+F12"`; modifiers must match exactly.
    #[serde(default)]
    pub keys: Vec<Keys>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_key_events: false,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the config file path from an explicit argument, the environment,
/// or the platform config directory, in that order.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither an explicit path
/// nor the environment variable is set and the platform directory is unknown.
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML or a key chord is malformed.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MonitorConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &MonitorConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory for keyhook.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("keyhook"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keyhook"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("keyhook")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
