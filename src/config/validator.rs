//! Configuration validator for memscan
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, LoggingConfig, ScannerConfig, StorageConfig};
use crate::core::types::NumericType;
use tracing::warn;

/// Upper bound on buffered diff matches
const MAX_FLUSH_THRESHOLD: usize = 1_000_000;

/// Chunk sizes above this are accepted with a warning
const LARGE_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_storage(&config.storage)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates scanner configuration
    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        // Whole words per chunk keeps reads aligned
        if !scanner.chunk_size.is_power_of_two() || scanner.chunk_size < NumericType::MAX_WIDTH {
            return Err(ConfigError::Invalid(format!(
                "Chunk size must be a power of 2 of at least {} bytes",
                NumericType::MAX_WIDTH
            )));
        }

        if scanner.chunk_size > LARGE_CHUNK_SIZE {
            warn!("Chunk size of {} bytes exceeds 64MB", scanner.chunk_size);
        }

        if scanner.flush_threshold == 0 || scanner.flush_threshold > MAX_FLUSH_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "Flush threshold must be between 1 and {}",
                MAX_FLUSH_THRESHOLD
            )));
        }

        if scanner.search_threads == 0 || scanner.search_threads > 128 {
            return Err(ConfigError::Invalid(
                "Search threads must be between 1 and 128".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates storage configuration
    fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
        if storage.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "Storage directory cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }
        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
