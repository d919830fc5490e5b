//! Store trait definitions

use serde::de::DeserializeOwned;
use sitewarden_api::{Settings, StorageKey, WhitelistEntry};

use crate::StoreResult;

/// Main store trait.
///
/// Implementors only provide raw JSON access per key; the typed accessors
/// apply the storage defaults (empty lists, default settings) for absent keys.
pub trait Store: Send + Sync {
    /// Read the raw JSON value stored under `key`
    fn get_raw(&self, key: StorageKey) -> StoreResult<Option<serde_json::Value>>;

    /// Replace the value stored under `key`
    fn set_raw(&self, key: StorageKey, value: &serde_json::Value) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;

    /// Whether a value exists for `key`
    fn contains(&self, key: StorageKey) -> StoreResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    fn load_blocked_sites(&self) -> StoreResult<Vec<String>> {
        load_or_default(self, StorageKey::BlockedSites)
    }

    fn load_whitelist(&self) -> StoreResult<Vec<WhitelistEntry>> {
        load_or_default(self, StorageKey::Whitelist)
    }

    fn load_settings(&self) -> StoreResult<Settings> {
        load_or_default(self, StorageKey::Settings)
    }

    /// Persist one full snapshot of a key
    fn apply(&self, write: &StorageWrite) -> StoreResult<()> {
        self.set_raw(write.key(), &write.to_value()?)
    }
}

fn load_or_default<S, T>(store: &S, key: StorageKey) -> StoreResult<T>
where
    S: Store + ?Sized,
    T: DeserializeOwned + Default,
{
    match store.get_raw(key)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

/// A full-snapshot write of one storage key
#[derive(Debug, Clone, PartialEq)]
pub enum StorageWrite {
    BlockedSites(Vec<String>),
    Whitelist(Vec<WhitelistEntry>),
    Settings(Settings),
}

impl StorageWrite {
    pub fn key(&self) -> StorageKey {
        match self {
            StorageWrite::BlockedSites(_) => StorageKey::BlockedSites,
            StorageWrite::Whitelist(_) => StorageKey::Whitelist,
            StorageWrite::Settings(_) => StorageKey::Settings,
        }
    }

    pub fn to_value(&self) -> StoreResult<serde_json::Value> {
        let value = match self {
            StorageWrite::BlockedSites(sites) => serde_json::to_value(sites)?,
            StorageWrite::Whitelist(entries) => serde_json::to_value(entries)?,
            StorageWrite::Settings(settings) => serde_json::to_value(settings)?,
        };
        Ok(value)
    }
}
