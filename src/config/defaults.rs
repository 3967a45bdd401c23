//! Default configuration values for memscan

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub storage: StorageDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub chunk_size: usize,
    pub flush_threshold: usize,
    pub search_threads: usize,
}

/// Default snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageDefaults {
    pub directory: String,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            chunk_size: 65536, // 64KB
            flush_threshold: 1000,
            search_threads: num_cpus::get().min(8),
        },
        storage: StorageDefaults {
            directory: "local".to_string(),
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
