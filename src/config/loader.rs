//! Configuration loader for memscan
//!
//! Reads `memscan.toml`, fills missing keys from defaults and applies the
//! storage root override from the environment.

use super::defaults::default_config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "memscan.toml";

/// Environment variable naming the root under which snapshots are stored
pub const STORAGE_ROOT_ENV: &str = "MEMSCAN_PATH";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one memscan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scanner")]
    pub scanner: ScannerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Bytes requested from the target per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Diff matches buffered before each write to disk
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    #[serde(default = "default_search_threads")]
    pub search_threads: usize,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Config {
    /// Stores snapshots under `<root>/local`, as set by `MEMSCAN_PATH`
    pub fn with_storage_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.storage.directory = root.as_ref().join(default_config().storage.directory);
        self
    }

    /// Applies `MEMSCAN_PATH` when it is set and non-empty
    pub fn apply_env(self) -> Self {
        match std::env::var_os(STORAGE_ROOT_ENV) {
            Some(root) if !root.is_empty() => self.with_storage_root(root),
            _ => self,
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reads and parses the file; a missing file is `FileNotFound`
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only when the file
    /// doesn't exist
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }
}

// Section defaults used by serde
fn default_scanner() -> ScannerConfig {
    let defaults = default_config();
    ScannerConfig {
        chunk_size: defaults.scanner.chunk_size,
        flush_threshold: defaults.scanner.flush_threshold,
        search_threads: defaults.scanner.search_threads,
    }
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        directory: default_directory(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
    }
}

// Individual field defaults
fn default_chunk_size() -> usize {
    default_config().scanner.chunk_size
}

fn default_flush_threshold() -> usize {
    default_config().scanner.flush_threshold
}

fn default_search_threads() -> usize {
    default_config().scanner.search_threads
}

fn default_directory() -> PathBuf {
    PathBuf::from(default_config().storage.directory)
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scanner: default_scanner(),
            storage: default_storage(),
            logging: default_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scanner.chunk_size, 65536);
        assert_eq!(config.storage.directory, PathBuf::from("local"));
        assert!(config.scanner.search_threads > 0);
    }

    #[test]
    fn test_load_missing_file() {
        let loader = ConfigLoader::new("nonexistent.toml");
        let result = loader.load();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_or_default() {
        let loader = ConfigLoader::new("nonexistent.toml");
        let config = loader.load_or_default().unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_default_keeps_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "[scanner\nchunk_size = ").unwrap();

        let result = ConfigLoader::new(&config_path).load_or_default();
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("memscan.toml");
        fs::write(&config_path, "[scanner]\nflush_threshold = 250\n").unwrap();

        let loader = ConfigLoader::new(&config_path);
        assert_eq!(loader.path(), config_path.as_path());

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.scanner.flush_threshold, 250);
        assert_eq!(loaded.scanner.chunk_size, 65536);
        assert_eq!(loaded.storage.directory, PathBuf::from("local"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
            [storage]
            directory = "/var/tmp/memscan"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.directory, PathBuf::from("/var/tmp/memscan"));
        // Check defaults are applied
        assert_eq!(config.scanner.chunk_size, 65536);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_storage_root() {
        let config = Config::default().with_storage_root("/srv/scans");
        assert_eq!(config.storage.directory, PathBuf::from("/srv/scans/local"));
    }
}
