//! Configuration file handling for `~/.gatorconfig.json`.
//!
//! The file records the storage location and the active username. It is
//! read once at startup and rewritten whenever the active user changes.
//! A missing or empty file yields `Config::default()`.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name of the config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not locate your home directory (HOME is not set)")]
    NoHomeDir,
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Persisted CLI state.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx SQLite URL (`sqlite://...`) or a plain database file path.
    /// Empty means `gator.db` next to the config file.
    pub db_url: String,

    /// Name of the logged-in user, if any.
    #[serde(rename = "current_user_name", skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,

    /// Per-request timeout for feed fetches in seconds. 0 disables it.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: String::new(),
            current_user: None,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Default config location: `$HOME/.gatorconfig.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHomeDir)?;
        Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid JSON → `Err(ConfigError::Parse)` with line/column info
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Config = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            user = ?config.current_user,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Write the config to `path` atomically (temp file, sync, rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        use std::io::Write;
        use std::time::{SystemTime, UNIX_EPOCH};

        let data = serde_json::to_vec_pretty(self)?;

        // SEC-009: Randomized temp filename so a pre-planted symlink cannot be followed
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        let written = temp_file
            .write_all(&data)
            .and_then(|_| temp_file.sync_all())
            .and_then(|_| {
                drop(temp_file);
                std::fs::rename(&temp_path, path)
            });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }

        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Set the active user and persist the change.
    pub fn set_user(&mut self, name: &str, path: &Path) -> Result<(), ConfigError> {
        self.current_user = Some(name.to_string());
        self.save(path)
    }

    /// Database location, falling back to `gator.db` beside the config file.
    pub fn database_location(&self, config_path: &Path) -> String {
        if !self.db_url.trim().is_empty() {
            return self.db_url.clone();
        }
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("gator.db")
            .display()
            .to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
