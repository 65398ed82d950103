//! Configuration loading and types for commonfs.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, the backing object store, the local staging area,
//! and logging.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Backing store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Staging area settings.
    #[serde(default)]
    pub staging: StagingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum upload size in bytes (default 5 GiB).
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_object_size: default_max_object_size(),
        }
    }
}

/// Backing store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `sqlite` or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite-specific configuration.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// SQLite-specific backing store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_sqlite_path")]
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
        }
    }
}

/// Staging area configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    /// Scratch directory for unverified uploads.
    #[serde(default = "default_staging_dir")]
    pub dir: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_object_size() -> u64 {
    5_368_709_120 // 5 GiB
}

fn default_storage_backend() -> String {
    "sqlite".to_string()
}

fn default_sqlite_path() -> String {
    "./data/commonfs.db".to_string()
}

fn default_staging_dir() -> String {
    "./data/staging".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.staging.dir, "./data/staging");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "
server:
  port: 9100
storage:
  backend: memory
staging:
  dir: /tmp/scratch
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9100);
        // Host falls back to the default when only port is given.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.staging.dir, "/tmp/scratch");
    }
}
