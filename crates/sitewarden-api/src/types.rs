//! Storage-backed value types

use serde::{Deserialize, Serialize};
use sitewarden_util::{DailyWindow, TabId, WallClock};
use std::fmt;
use std::str::FromStr;

/// Default start of the blocking window
pub const DEFAULT_TIME_FROM: &str = "08:00";

/// Default end of the blocking window
pub const DEFAULT_TIME_TO: &str = "18:00";

/// Time-window settings as stored under the `settings` key.
///
/// Clock strings are kept verbatim so a malformed value written by another
/// context survives a round trip; `window()` is where they get interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub time_slots_enabled: bool,
    pub time_from: String,
    pub time_to: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_slots_enabled: false,
            time_from: DEFAULT_TIME_FROM.into(),
            time_to: DEFAULT_TIME_TO.into(),
        }
    }
}

impl Settings {
    /// Parsed blocking window, or `None` if either bound is not a valid `HH:MM`
    pub fn window(&self) -> Option<DailyWindow> {
        let from: WallClock = self.time_from.parse().ok()?;
        let to: WallClock = self.time_to.parse().ok()?;
        Some(DailyWindow::new(from, to))
    }
}

/// A snooze: blocking for `domain` is suspended in `tab_id` until `expire`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntry {
    /// Normalized host, no scheme or path
    pub domain: String,
    /// Absolute expiry, milliseconds since the Unix epoch
    pub expire: i64,
    pub tab_id: TabId,
}

impl WhitelistEntry {
    pub fn is_live(&self, now_millis: i64) -> bool {
        self.expire > now_millis
    }

    pub fn same_slot(&self, domain: &str, tab_id: TabId) -> bool {
        self.domain == domain && self.tab_id == tab_id
    }
}

/// Keys of the persisted storage area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    #[serde(rename = "blockedSites")]
    BlockedSites,
    #[serde(rename = "whitelist")]
    Whitelist,
    #[serde(rename = "settings")]
    Settings,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::BlockedSites,
        StorageKey::Whitelist,
        StorageKey::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::BlockedSites => "blockedSites",
            StorageKey::Whitelist => "whitelist",
            StorageKey::Settings => "settings",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKey {
    type Err = UnknownStorageKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownStorageKey(s.to_string()))
    }
}

/// Returned when parsing a storage key the service does not know about
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown storage key: {0}")]
pub struct UnknownStorageKey(pub String);

/// One changed key inside a storage-change notification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// New value; absent when the key was removed
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
}
