//! Configuration validation

use crate::schema::{RawConfig, RawPersistenceSection};
use crate::service::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF_MS, MAX_CLEANUP_PERIOD_MINUTES,
};
use sitewarden_util::{RetryPolicy, WallClock, normalize_domain};
use std::time::Duration;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    FieldError {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Seed block-list entry '{0}' has no extractable domain")]
    InvalidSeedDomain(String),
}

impl ValidationError {
    fn field(section: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self::FieldError {
            section,
            field,
            message: message.into(),
        }
    }
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let extension = &config.extension;
    if extension.block_page.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push(ValidationError::field("extension", "block_page", "cannot be empty"));
    }
    if extension.config_page.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push(ValidationError::field("extension", "config_page", "cannot be empty"));
    }
    if extension.command_timeout_seconds == Some(0) {
        errors.push(ValidationError::field(
            "extension",
            "command_timeout_seconds",
            "must be greater than 0",
        ));
    }

    match config.whitelist.cleanup_period_minutes {
        Some(0) => errors.push(ValidationError::field(
            "whitelist",
            "cleanup_period_minutes",
            "must be greater than 0",
        )),
        Some(minutes) if minutes > MAX_CLEANUP_PERIOD_MINUTES => {
            errors.push(ValidationError::field(
                "whitelist",
                "cleanup_period_minutes",
                format!("must be at most {MAX_CLEANUP_PERIOD_MINUTES}"),
            ))
        }
        _ => {}
    }

    if let Err(e) = retry_policy_from_raw(&config.persistence) {
        errors.push(ValidationError::field("persistence", "retry", e.to_string()));
    }

    if let Some(sites) = &config.seed.blocked_sites {
        for site in sites {
            if normalize_domain(site).is_none() {
                errors.push(ValidationError::InvalidSeedDomain(site.clone()));
            }
        }
    }

    if let Some(settings) = &config.seed.settings {
        for value in [&settings.time_from, &settings.time_to] {
            if let Err(e) = parse_time(value) {
                errors.push(ValidationError::InvalidTimeFormat {
                    value: value.clone(),
                    message: e,
                });
            }
        }
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<WallClock, String> {
    s.parse::<WallClock>().map_err(|e| match e {
        sitewarden_util::WardenError::InvalidTime { message, .. } => message,
        other => other.to_string(),
    })
}

pub(crate) fn retry_policy_from_raw(
    raw: &RawPersistenceSection,
) -> sitewarden_util::Result<RetryPolicy> {
    RetryPolicy::new(
        raw.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        Duration::from_millis(raw.initial_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS)),
        raw.backoff_multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER),
        Duration::from_millis(raw.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS)),
    )
}
