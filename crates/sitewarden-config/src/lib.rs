//! Configuration parsing and validation for sitewardend
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Extension page locations (block page, config page)
//! - Whitelist cleanup cadence
//! - Persistence retry policy
//! - Optional seed values for an empty store
//! - Validation with clear error messages

mod schema;
mod service;
mod validation;

pub use schema::*;
pub use service::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to built-in defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(ServiceConfig::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<ServiceConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(ServiceConfig::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();
        assert_eq!(config.whitelist.cleanup_period, Duration::from_secs(5 * 60));
        assert_eq!(config.extension.block_page, "block/block.html");
        assert!(config.seed.blocked_sites.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
            config_version = 1

            [service]
            data_dir = "/var/lib/sitewarden"

            [extension]
            block_page = "chrome-extension://abc/block/block.html"
            config_page = "config/config.html"
            command_timeout_seconds = 3

            [whitelist]
            cleanup_period_minutes = 1

            [persistence]
            max_attempts = 3
            initial_backoff_ms = 50
            backoff_multiplier = 3.0
            max_backoff_ms = 1000

            [seed]
            blocked_sites = ["example.com", "news.example.org"]
            settings = { time_slots_enabled = true, time_from = "09:00", time_to = "17:30" }
            "#,
        )
        .unwrap();

        assert_eq!(config.service.data_dir.to_str(), Some("/var/lib/sitewarden"));
        assert_eq!(config.extension.command_timeout, Duration::from_secs(3));
        assert_eq!(config.whitelist.cleanup_period, Duration::from_secs(60));
        assert_eq!(config.persistence.max_attempts, 3);
        assert_eq!(config.persistence.initial_backoff, Duration::from_millis(50));
        assert_eq!(
            config.seed.blocked_sites.as_deref(),
            Some(&["example.com".to_string(), "news.example.org".to_string()][..])
        );
        let settings = config.seed.settings.unwrap();
        assert!(settings.time_slots_enabled);
        assert_eq!(settings.time_to, "17:30");
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let result = parse_config(
            r#"
            config_version = 1

            [whitelist]
            cleanup_period_minutes = 0

            [seed]
            settings = { time_slots_enabled = true, time_from = "8am", time_to = "18:00" }
            "#,
        );

        match result {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn reject_huge_cleanup_period() {
        let result = parse_config(
            "config_version = 1\n[whitelist]\ncleanup_period_minutes = 9223372036854775807\n",
        );

        match result {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.extension.block_page, "block/block.html");
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1\n[whitelist]\ncleanup_period_minutes = 2").unwrap();

        let config = load_config_or_default(file.path()).unwrap();
        assert_eq!(config.whitelist.cleanup_period, Duration::from_secs(120));
    }
}
