//! Cached block-list and settings

use sitewarden_api::{Settings, StorageChange, StorageKey};
use sitewarden_store::{Store, StoreError, StoreResult, StorageWrite};
use sitewarden_util::{DailyWindow, host_matches, normalize_domain};
use tracing::{debug, info, warn};

/// In-memory copy of the rules the config page edits.
///
/// Only ever replaced wholesale: from a storage read, or from the new value
/// carried by a storage-change notification.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    block_list: Vec<String>,
    settings: Settings,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(block_list: Vec<String>, settings: Settings) -> Self {
        Self {
            block_list,
            settings,
        }
    }

    pub fn block_list(&self) -> &[String] {
        &self.block_list
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_block_list(&mut self, block_list: Vec<String>) {
        self.block_list = block_list;
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Reload the block-list from storage. An undecodable value is logged and
    /// leaves the cache untouched.
    pub fn refresh_block_list(&mut self, store: &dyn Store) -> StoreResult<()> {
        match store.load_blocked_sites() {
            Ok(sites) => {
                info!(count = sites.len(), "Block-list loaded");
                self.block_list = sites;
                Ok(())
            }
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Stored block-list is malformed, keeping current");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reload settings from storage. An undecodable value is logged and
    /// leaves the cache untouched.
    pub fn refresh_settings(&mut self, store: &dyn Store) -> StoreResult<()> {
        match store.load_settings() {
            Ok(settings) => {
                info!(
                    enabled = settings.time_slots_enabled,
                    from = %settings.time_from,
                    to = %settings.time_to,
                    "Settings loaded"
                );
                self.settings = settings;
                Ok(())
            }
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Stored settings are malformed, keeping current");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a storage-change notification for `key`.
    ///
    /// Returns the snapshot to mirror into the local store, or `None` when the
    /// key is not a rule key or the new value cannot be decoded.
    pub fn apply_change(&mut self, key: StorageKey, change: &StorageChange) -> Option<StorageWrite> {
        match key {
            StorageKey::BlockedSites => {
                let sites: Vec<String> = decode_or_default(key, change)?;
                debug!(count = sites.len(), "Block-list replaced from notification");
                self.block_list = sites;
                Some(StorageWrite::BlockedSites(self.block_list.clone()))
            }
            StorageKey::Settings => {
                let settings: Settings = decode_or_default(key, change)?;
                debug!(
                    enabled = settings.time_slots_enabled,
                    "Settings replaced from notification"
                );
                self.settings = settings;
                Some(StorageWrite::Settings(self.settings.clone()))
            }
            StorageKey::Whitelist => {
                debug!("Ignoring whitelist change notification");
                None
            }
        }
    }

    /// Blocking window if time slots are enabled.
    ///
    /// `Some(None)` means slots are enabled but a bound does not parse.
    pub fn active_window(&self) -> Option<Option<DailyWindow>> {
        self.settings
            .time_slots_enabled
            .then(|| self.settings.window())
    }

    /// Whether the URL's host is, or is a subdomain of, any listed domain
    pub fn is_listed(&self, url: &str) -> bool {
        let Some(host) = normalize_domain(url) else {
            return false;
        };

        self.block_list
            .iter()
            .filter_map(|domain| normalize_domain(domain))
            .any(|domain| host_matches(&host, &domain))
    }
}

fn decode_or_default<T>(key: StorageKey, change: &StorageChange) -> Option<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match &change.new_value {
        None => {
            debug!(key = %key, "Key removed, resetting to default");
            Some(T::default())
        }
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring undecodable storage change");
                None
            }
        },
    }
}
