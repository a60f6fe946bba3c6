//! Runtime configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the core can start with zero
//! configuration for local development.

use std::path::PathBuf;

/// Configuration for a [`crate::SyncContext`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Explicit path for the SQLite database file.
    /// Env: `CAUSERIE_DB_PATH`
    /// Default: none (platform data directory).
    pub db_path: Option<PathBuf>,

    /// Filesystem path where attachment blobs are stored.
    /// Env: `CAUSERIE_BLOB_DIR`
    /// Default: `./blobs`
    pub blob_dir: PathBuf,

    /// Maximum attachment size in bytes.
    /// Env: `CAUSERIE_MAX_BLOB_SIZE`
    /// Default: 10 MiB.
    pub max_blob_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            blob_dir: PathBuf::from("./blobs"),
            max_blob_size: 10 * 1024 * 1024, // 10 MiB
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CAUSERIE_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(path) = std::env::var("CAUSERIE_BLOB_DIR") {
            if !path.is_empty() {
                config.blob_dir = PathBuf::from(path);
            }
        }

        if let Ok(val) = std::env::var("CAUSERIE_MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid CAUSERIE_MAX_BLOB_SIZE, using default"
                    );
                }
            }
        }

        // RUST_LOG is handled directly by the embedder's tracing subscriber,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.db_path.is_none());
        assert_eq!(config.blob_dir, PathBuf::from("./blobs"));
        assert_eq!(config.max_blob_size, 10 * 1024 * 1024);
    }
}
