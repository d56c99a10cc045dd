use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, WavError};
use crate::input::DEFAULT_READ_CHUNK_SIZE;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Defaults that can be saved to a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bytes requested from the source per read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_chunk_size: Option<usize>,

    /// tracing filter used when RUST_LOG is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Config {
            read_chunk_size: None,
            log_level: None,
        }
    }

    /// Get the config file path (~/.state/wavscan/defaults.toml)
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            WavError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "HOME environment variable not set",
            ))
        })?;

        let config_dir = Path::new(&home).join(".state").join("wavscan");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load config from `path`; a missing file gives an empty config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| WavError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| WavError::Config(e.to_string()))?;
        fs::write(path, toml_string)?;

        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.read_chunk_size.is_some() {
            self.read_chunk_size = other.read_chunk_size;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
    }

    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_READ_CHUNK_SIZE)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.read_chunk_size(), DEFAULT_READ_CHUNK_SIZE);
        assert_eq!(config.log_level(), "info");

        let zero = Config {
            read_chunk_size: Some(0),
            log_level: None,
        };
        assert_eq!(zero.read_chunk_size(), DEFAULT_READ_CHUNK_SIZE);
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            read_chunk_size: Some(1024),
            log_level: Some("warn".to_string()),
        };
        let other = Config {
            read_chunk_size: None,
            log_level: Some("debug".to_string()),
        };
        base.merge(&other);
        assert_eq!(base.read_chunk_size(), 1024);
        assert_eq!(base.log_level(), "debug");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("defaults.toml");

        let config = Config {
            read_chunk_size: Some(4096),
            log_level: Some("wavscan=trace".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.toml");
        fs::write(&path, "read_chunk_size = \"lots\"").unwrap();
        assert!(matches!(Config::load_from(&path), Err(WavError::Config(_))));
    }
}
