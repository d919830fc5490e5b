//! Validated service configuration

use crate::schema::{RawConfig, RawSeedSettings};
use crate::validation::retry_policy_from_raw;
use sitewarden_api::Settings;
use sitewarden_util::{RetryPolicy, data_dir_without_env};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BLOCK_PAGE: &str = "block/block.html";
pub const DEFAULT_CONFIG_PAGE: &str = "config/config.html";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CLEANUP_PERIOD_MINUTES: u64 = 5;
pub const MAX_CLEANUP_PERIOD_MINUTES: u64 = 24 * 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub extension: ExtensionConfig,
    pub whitelist: WhitelistConfig,
    pub persistence: RetryPolicy,
    pub seed: SeedConfig,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let persistence = retry_policy_from_raw(&raw.persistence).unwrap_or_default();

        Self {
            service: ServiceSection {
                data_dir: raw.service.data_dir.unwrap_or_else(data_dir_without_env),
            },
            extension: ExtensionConfig {
                block_page: raw
                    .extension
                    .block_page
                    .unwrap_or_else(|| DEFAULT_BLOCK_PAGE.into()),
                config_page: raw
                    .extension
                    .config_page
                    .unwrap_or_else(|| DEFAULT_CONFIG_PAGE.into()),
                command_timeout: Duration::from_secs(
                    raw.extension
                        .command_timeout_seconds
                        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
                ),
            },
            whitelist: WhitelistConfig {
                cleanup_period: Duration::from_secs(
                    raw.whitelist
                        .cleanup_period_minutes
                        .unwrap_or(DEFAULT_CLEANUP_PERIOD_MINUTES)
                        .saturating_mul(60),
                ),
            },
            persistence,
            seed: SeedConfig {
                blocked_sites: raw.seed.blocked_sites,
                settings: raw.seed.settings.map(convert_settings),
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: Default::default(),
            extension: Default::default(),
            whitelist: Default::default(),
            persistence: Default::default(),
            seed: Default::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSection {
    pub data_dir: PathBuf,
}

/// Extension page locations, as configured (possibly relative)
#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    pub block_page: String,
    pub config_page: String,
    pub command_timeout: Duration,
}

impl ExtensionConfig {
    /// Resolve page locations against the calling extension's origin.
    ///
    /// Browsers launch native hosts with the caller origin
    /// (`chrome-extension://<id>/`) as the first argument. Absolute page URLs
    /// are used as-is; relative ones are joined onto the origin when known.
    pub fn page_urls(&self, origin: Option<&str>) -> PageUrls {
        PageUrls {
            block_page: resolve_page(&self.block_page, origin),
            config_page: resolve_page(&self.config_page, origin),
        }
    }
}

/// Fully resolved extension page URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrls {
    pub block_page: String,
    pub config_page: String,
}

fn resolve_page(page: &str, origin: Option<&str>) -> String {
    let page = page.trim();
    if page.contains("://") {
        return page.to_string();
    }

    match origin {
        Some(origin) if !origin.trim().is_empty() => format!(
            "{}/{}",
            origin.trim().trim_end_matches('/'),
            page.trim_start_matches('/')
        ),
        _ => page.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct WhitelistConfig {
    pub cleanup_period: Duration,
}

/// Seed values, applied only to keys missing from the store
#[derive(Debug, Clone, Default)]
pub struct SeedConfig {
    pub blocked_sites: Option<Vec<String>>,
    pub settings: Option<Settings>,
}

fn convert_settings(raw: RawSeedSettings) -> Settings {
    Settings {
        time_slots_enabled: raw.time_slots_enabled,
        time_from: raw.time_from,
        time_to: raw.time_to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_pages_join_origin() {
        let config = ServiceConfig::default();
        let urls = config.extension.page_urls(Some("chrome-extension://abcdef/"));
        assert_eq!(urls.block_page, "chrome-extension://abcdef/block/block.html");
        assert_eq!(urls.config_page, "chrome-extension://abcdef/config/config.html");
    }

    #[test]
    fn absolute_pages_ignore_origin() {
        let mut config = ServiceConfig::default();
        config.extension.block_page = "moz-extension://xyz/block.html".into();
        let urls = config.extension.page_urls(Some("chrome-extension://abcdef/"));
        assert_eq!(urls.block_page, "moz-extension://xyz/block.html");
    }

    #[test]
    fn missing_origin_keeps_relative_page() {
        let urls = ServiceConfig::default().extension.page_urls(None);
        assert_eq!(urls.block_page, "block/block.html");
    }

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.whitelist.cleanup_period, Duration::from_secs(300));
        assert_eq!(config.extension.command_timeout, Duration::from_secs(10));
        assert_eq!(config.persistence, RetryPolicy::default());
    }
}
