//! Tracing subscriber bootstrap.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init`] is a convenience for applications and
//! tests that have no subscriber of their own.

use crate::config::LogConfig;
use crate::error::{CloudError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber filtered by `config.filter`.
///
/// `RUST_LOG` takes precedence when set. Returns `Ok(false)` when a global
/// subscriber was already installed, leaving it in place.
pub fn init(config: &LogConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    Ok(installed)
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|err| CloudError::Config(format!("invalid log filter '{}': {}", config.filter, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ENV_LOCK;
    use std::env;
    use std::ffi::OsString;

    /// Run `f` with `RUST_LOG` set to `value` (or unset), restoring it after.
    fn with_rust_log<R>(value: Option<&str>, f: impl FnOnce() -> R) -> R {
        let _env = ENV_LOCK.lock();
        let saved: Option<OsString> = env::var_os("RUST_LOG");
        match value {
            Some(value) => env::set_var("RUST_LOG", value),
            None => env::remove_var("RUST_LOG"),
        }
        let out = f();
        match saved {
            Some(saved) => env::set_var("RUST_LOG", saved),
            None => env::remove_var("RUST_LOG"),
        }
        out
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = LogConfig {
            filter: "cloudmap=notalevel".to_string(),
        };
        let result = with_rust_log(None, || build_filter(&config));
        assert!(matches!(result, Err(CloudError::Config(_))));
    }

    #[test]
    fn test_rust_log_wins_over_config_filter() {
        let config = LogConfig {
            filter: "cloudmap=notalevel".to_string(),
        };
        let result = with_rust_log(Some("cloudmap=debug"), || build_filter(&config));
        assert!(result.is_ok());
    }

    #[test]
    fn test_second_init_does_not_panic() {
        let config = LogConfig::default();
        let (first, second) = with_rust_log(None, || {
            let first = init(&config);
            let second = init(&config);
            (first, second)
        });
        assert!(first.is_ok());
        assert!(!second.unwrap());
    }
}
