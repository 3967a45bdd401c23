//! Configuration module for memscan
//!
//! Provides configuration loading, validation, and default settings
//! for the scanner.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE, STORAGE_ROOT_ENV};
pub use validator::{validate_config, ConfigValidator};

// Re-export the main configuration structures
pub use loader::{Config, LoggingConfig, ScannerConfig, StorageConfig};

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
