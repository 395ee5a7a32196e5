//! Configuration: `config.toml` plus environment overrides.
//!
//! Lookup order for the file:
//! 1. WOLFIES_BLITZ_CONFIG env var
//! 2. ~/.wolfies-blitz/config.toml
//!
//! A missing file means defaults. Path overrides:
//! WOLFIES_BLITZ_STORE, WOLFIES_BLITZ_SOCKET, WOLFIES_BLITZ_MESSAGES_DB.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wolfies-blitz")
}

pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("WOLFIES_BLITZ_CONFIG") {
        return expand_path(&path);
    }
    base_dir().join("config.toml")
}

/// Expand `~` in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pacing: PacingConfig,
    pub paths: PathsConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_backoff_ms: u64,
    pub max_retries: u32,
    pub resolve_timeout_ms: u64,
    pub ready_timeout_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5_000,
            max_delay_ms: 15_000,
            retry_backoff_ms: 2_000,
            max_retries: crate::sender::MAX_RETRIES,
            resolve_timeout_ms: 5_000,
            ready_timeout_ms: 10_000,
        }
    }
}

impl PacingConfig {
    /// Upper bound on one contact's attempts, which a shutdown lets finish.
    pub fn settle_timeout(&self) -> Duration {
        let per_attempt = self.resolve_timeout_ms + self.ready_timeout_ms + self.retry_backoff_ms;
        Duration::from_millis(per_attempt * (u64::from(self.max_retries) + 1)) + Duration::from_secs(5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub store: String,
    pub socket: String,
    pub messages_db: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            store: "~/.wolfies-blitz/store.db".to_string(),
            socket: "~/.wolfies-blitz/daemon.sock".to_string(),
            messages_db: "~/Library/Messages/chat.db".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn store_path(&self) -> PathBuf {
        expand_path(&self.store)
    }

    pub fn socket_path(&self) -> PathBuf {
        expand_path(&self.socket)
    }

    pub fn messages_db_path(&self) -> PathBuf {
        expand_path(&self.messages_db)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Send to phones with no existing Messages handle
    pub allow_unlisted_handles: bool,
}

impl Config {
    /// Load from the default location, then apply env overrides.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(default_config_path())
    }

    /// Load from `path` (defaults if it does not exist), then apply env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(store) = std::env::var("WOLFIES_BLITZ_STORE") {
            self.paths.store = store;
        }
        if let Ok(socket) = std::env::var("WOLFIES_BLITZ_SOCKET") {
            self.paths.socket = socket;
        }
        if let Ok(db) = std::env::var("WOLFIES_BLITZ_MESSAGES_DB") {
            self.paths.messages_db = db;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pacing.min_delay_ms > self.pacing.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "pacing.min_delay_ms ({}) exceeds pacing.max_delay_ms ({})",
                self.pacing.min_delay_ms, self.pacing.max_delay_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_timeout_covers_every_attempt() {
        let pacing = PacingConfig {
            max_retries: 1,
            ..PacingConfig::default()
        };
        // 2 attempts of (5s resolve + 10s deliver + 2s backoff), plus slack
        assert_eq!(pacing.settle_timeout(), Duration::from_secs(39));
    }

    #[test]
    fn test_empty_toml_is_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config = Config::from_toml(
            r#"
            [pacing]
            max_retries = 5

            [transport]
            allow_unlisted_handles = true
            "#,
        )
        .unwrap();
        assert_eq!(config.pacing.max_retries, 5);
        assert_eq!(config.pacing.min_delay_ms, 5_000);
        assert!(config.transport.allow_unlisted_handles);
    }

    #[test]
    fn test_inverted_delay_window_rejected() {
        let err = Config::from_toml("[pacing]\nmin_delay_ms = 9000\nmax_delay_ms = 1000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            Config::from_toml("[pacing\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths]\nsocket = \"/tmp/blitz.sock\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.socket, "/tmp/blitz.sock");
    }

    #[test]
    fn test_tilde_expansion() {
        let path = PathsConfig::default().store_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with(".wolfies-blitz/store.db"));
    }
}
