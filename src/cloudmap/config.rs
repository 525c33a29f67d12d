//! # Configuration
//!
//! Configuration is derived with [`confique`] and resolved in priority order:
//! 1. **Environment variables**: `CLOUDMAP_ZONE_NAME`, `CLOUDMAP_RESULTS_LIMIT`,
//!    `CLOUDMAP_LOG_FILTER`.
//! 2. **Config file**: `cloudmap.toml`, by default in the OS-appropriate config
//!    directory (via `directories`). A missing file is skipped.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `zone_name` | `_defaultZone` | Zone new records are created in |
//! | `results_limit` | unset | Page size when a find call gives none; unset lets the store decide |
//! | `log.filter` | `info` | Tracing filter directive |

use crate::error::Result;
use crate::model::{ZoneId, DEFAULT_ZONE_NAME};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "cloudmap.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    /// Zone new records are created in.
    #[config(env = "CLOUDMAP_ZONE_NAME", default = "_defaultZone")]
    pub zone_name: String,

    /// Default page size for find calls that pass no limit.
    #[config(env = "CLOUDMAP_RESULTS_LIMIT")]
    pub results_limit: Option<usize>,

    #[config(nested)]
    pub log: LogConfig,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `cloudmap=debug`.
    #[config(env = "CLOUDMAP_LOG_FILTER", default = "info")]
    pub filter: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            zone_name: DEFAULT_ZONE_NAME.to_string(),
            results_limit: None,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl CloudConfig {
    /// Load from the environment and `path`, or the default location when
    /// `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    pub fn zone_id(&self) -> ZoneId {
        ZoneId::new(self.zone_name.as_str())
    }
}

/// `cloudmap.toml` in the platform config directory, when one exists.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cloudmap").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ENV_LOCK;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CloudConfig::default();
        assert_eq!(config.zone_name, "_defaultZone");
        assert_eq!(config.results_limit, None);
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.zone_id(), ZoneId::default());
    }

    #[test]
    fn test_load_from_file() {
        let _env = ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "zone_name = \"Notes\"\nresults_limit = 25\n\n[log]\nfilter = \"cloudmap=debug\"\n",
        )
        .unwrap();

        let config = CloudConfig::load(Some(&path)).unwrap();
        assert_eq!(config.zone_name, "Notes");
        assert_eq!(config.results_limit, Some(25));
        assert_eq!(config.log.filter, "cloudmap=debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let _env = ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "results_limit = 10\n").unwrap();

        let config = CloudConfig::load(Some(&path)).unwrap();
        assert_eq!(config.zone_name, "_defaultZone");
        assert_eq!(config.results_limit, Some(10));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let _env = ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let config = CloudConfig::load(Some(&path)).unwrap();
        assert_eq!(config.results_limit, None);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let _env = ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "results_limit = \"lots\"\n").unwrap();

        let err = CloudConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, crate::error::CloudError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "zone_name = \"FromFile\"\nresults_limit = 3\n").unwrap();

        env::set_var("CLOUDMAP_ZONE_NAME", "FromEnv");
        let loaded = CloudConfig::load(Some(&path));
        env::remove_var("CLOUDMAP_ZONE_NAME");

        let config = loaded.unwrap();
        assert_eq!(config.zone_name, "FromEnv");
        assert_eq!(config.results_limit, Some(3));
        assert_eq!(config.log.filter, "info");
    }
}
