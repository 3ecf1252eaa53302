//! File storage configuration.

use serde::{Deserialize, Serialize};

/// Storage configuration for document payloads.
///
/// The root path is an explicit configuration value passed into the file
/// store at construction; nothing in the storage layer consults ambient
/// global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which all document subtrees live.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum accepted payload size in bytes (default 10 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

fn default_root_path() -> String {
    "./data/storage/docs".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}
