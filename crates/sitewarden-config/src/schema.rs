//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceSection,

    /// Where the extension's pages live and how long to wait on it
    #[serde(default)]
    pub extension: RawExtensionSection,

    /// Snooze bookkeeping
    #[serde(default)]
    pub whitelist: RawWhitelistSection,

    /// Write retry policy
    #[serde(default)]
    pub persistence: RawPersistenceSection,

    /// Values written to an empty store on first start
    #[serde(default)]
    pub seed: RawSeedSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceSection {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawExtensionSection {
    /// Block page, absolute or relative to the extension origin
    pub block_page: Option<String>,

    /// Configuration page, absolute or relative to the extension origin
    pub config_page: Option<String>,

    /// How long to wait for the extension to acknowledge a tab command
    pub command_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWhitelistSection {
    /// Period of the whitelist cleanup timer
    pub cleanup_period_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPersistenceSection {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSeedSection {
    pub blocked_sites: Option<Vec<String>>,
    pub settings: Option<RawSeedSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSeedSettings {
    #[serde(default)]
    pub time_slots_enabled: bool,
    pub time_from: String,
    pub time_to: String,
}
