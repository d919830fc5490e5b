//! Snooze whitelist

use sitewarden_api::WhitelistEntry;
use sitewarden_store::StorageWrite;
use sitewarden_util::{TabId, is_matching_domain, minutes_to_millis, normalize_domain};
use tracing::{debug, warn};

/// Per-tab snoozes, at most one per (domain, tab).
///
/// Times are epoch milliseconds. Expired entries linger until the next
/// [`prune`](Self::prune) but never count as live.
#[derive(Debug, Clone, Default)]
pub struct WhitelistManager {
    entries: Vec<WhitelistEntry>,
}

impl WhitelistManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with entries read from storage
    pub fn load(&mut self, entries: Vec<WhitelistEntry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snooze `url`'s domain in `tab_id` for `minutes`.
    ///
    /// Supersedes any entry for the same (domain, tab). Returns `None`, and
    /// changes nothing, when no domain can be extracted or `minutes` is not a
    /// positive finite number.
    pub fn add(&mut self, url: &str, tab_id: TabId, minutes: f64, now: i64) -> Option<WhitelistEntry> {
        let Some(domain) = normalize_domain(url) else {
            warn!(url, tab_id = %tab_id, "Cannot snooze: no domain in URL");
            return None;
        };
        let Some(duration) = minutes_to_millis(minutes) else {
            warn!(minutes, tab_id = %tab_id, "Cannot snooze: invalid duration");
            return None;
        };

        let entry = WhitelistEntry {
            domain,
            expire: now.saturating_add(duration),
            tab_id,
        };

        self.entries.retain(|e| !e.same_slot(&entry.domain, tab_id));
        self.entries.push(entry.clone());
        debug!(domain = %entry.domain, tab_id = %tab_id, expire = entry.expire, "Snooze added");

        Some(entry)
    }

    /// Drop every entry with `expire <= now`; returns how many were dropped
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_live(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Expired snoozes pruned");
        }
        removed
    }

    /// Whether a live entry for `tab_id` covers `url`'s domain
    pub fn is_whitelisted(&self, url: &str, tab_id: TabId, now: i64) -> bool {
        self.entries
            .iter()
            .any(|e| e.tab_id == tab_id && e.is_live(now) && is_matching_domain(url, &e.domain))
    }

    /// Full snapshot for persistence
    pub fn snapshot(&self) -> StorageWrite {
        StorageWrite::Whitelist(self.entries.clone())
    }
}
