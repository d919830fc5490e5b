//! Core engine: one state holder, one dispatch function

use chrono::{DateTime, Local};
use sitewarden_api::{RuntimeMessage, StorageChange, StorageKey, TabStatus, TimerName};
use sitewarden_config::{PageUrls, SeedConfig};
use sitewarden_store::{Store, StoreResult, StorageWrite};
use sitewarden_util::{TabId, minutes_to_millis};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    DecisionEngine, Effect, CoreInput, RuleStore, SchedulerAdapter, Verdict, WhitelistManager,
    block_redirect_url,
};

/// Owns all mutable blocking state.
///
/// Every input goes through [`CoreEngine::handle`], which updates state
/// synchronously and returns the effects to carry out.
pub struct CoreEngine {
    rules: RuleStore,
    whitelist: WhitelistManager,
    pages: PageUrls,
    cleanup_period: Duration,
}

impl CoreEngine {
    pub fn new(pages: PageUrls, cleanup_period: Duration) -> Self {
        info!(
            block_page = %pages.block_page,
            config_page = %pages.config_page,
            "Core engine created"
        );

        Self {
            rules: RuleStore::new(),
            whitelist: WhitelistManager::new(),
            pages,
            cleanup_period,
        }
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn whitelist(&self) -> &WhitelistManager {
        &self.whitelist
    }

    pub fn pages(&self) -> &PageUrls {
        &self.pages
    }

    /// Decision engine over the current state
    pub fn decision(&self) -> DecisionEngine<'_> {
        DecisionEngine::new(&self.rules, &self.whitelist, &self.pages.block_page)
    }

    /// Load state from storage: settings, block-list, whitelist (pruned and
    /// persisted), then the cleanup timer. Seed values fill keys the store
    /// does not have yet.
    pub fn initialize(
        &mut self,
        store: &dyn Store,
        seed: &SeedConfig,
        now: DateTime<Local>,
    ) -> StoreResult<Vec<Effect>> {
        let mut effects = Vec::new();

        match (&seed.settings, store.contains(StorageKey::Settings)?) {
            (Some(settings), false) => {
                info!("Seeding settings from config");
                self.rules.set_settings(settings.clone());
                effects.push(Effect::Persist(StorageWrite::Settings(settings.clone())));
            }
            _ => self.rules.refresh_settings(store)?,
        }

        match (&seed.blocked_sites, store.contains(StorageKey::BlockedSites)?) {
            (Some(sites), false) => {
                info!(count = sites.len(), "Seeding block-list from config");
                self.rules.set_block_list(sites.clone());
                effects.push(Effect::Persist(StorageWrite::BlockedSites(sites.clone())));
            }
            _ => self.rules.refresh_block_list(store)?,
        }

        effects.push(self.refresh_whitelist(store, now)?);
        effects.push(Effect::ScheduleCleanup {
            period: self.cleanup_period,
        });

        info!(
            blocked = self.rules.block_list().len(),
            snoozes = self.whitelist.len(),
            time_slots = self.rules.settings().time_slots_enabled,
            "Core engine initialized"
        );

        Ok(effects)
    }

    /// Reload the whitelist from storage, drop expired entries, and return the
    /// write that persists the pruned snapshot
    pub fn refresh_whitelist(&mut self, store: &dyn Store, now: DateTime<Local>) -> StoreResult<Effect> {
        match store.load_whitelist() {
            Ok(entries) => self.whitelist.load(entries),
            Err(sitewarden_store::StoreError::Serialization(e)) => {
                warn!(error = %e, "Stored whitelist is malformed, starting empty");
                self.whitelist.load(Vec::new());
            }
            Err(e) => return Err(e),
        }
        self.whitelist.prune(now.timestamp_millis());
        Ok(Effect::Persist(self.whitelist.snapshot()))
    }

    /// Process one input
    pub fn handle(&mut self, input: CoreInput, now: DateTime<Local>) -> Vec<Effect> {
        match input {
            CoreInput::Navigation {
                tab_id,
                status,
                url,
            } => self.on_navigation(tab_id, status, url, now),
            CoreInput::Message {
                sender_tab_id,
                message,
            } => self.on_message(sender_tab_id, message, now),
            CoreInput::TimerFired { name } => self.on_timer(&name, now),
            CoreInput::StorageChanged { changes } => self.on_storage_changed(changes),
            CoreInput::ToolbarClicked => {
                debug!("Toolbar clicked, opening config page");
                vec![Effect::OpenTab {
                    url: self.pages.config_page.clone(),
                }]
            }
        }
    }

    fn on_navigation(
        &mut self,
        tab_id: TabId,
        status: TabStatus,
        url: Option<String>,
        now: DateTime<Local>,
    ) -> Vec<Effect> {
        if status != TabStatus::Loading {
            return Vec::new();
        }
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return Vec::new();
        };
        if !self.pages.block_page.is_empty() && url.starts_with(&self.pages.block_page) {
            return Vec::new();
        }

        self.whitelist.prune(now.timestamp_millis());
        let mut effects = vec![Effect::Persist(self.whitelist.snapshot())];

        let verdict = self.decision().evaluate(Some(&url), tab_id, &now);
        match verdict {
            Verdict::Block => {
                info!(tab_id = %tab_id, url = %url, "Blocking navigation");
                effects.push(Effect::Redirect {
                    tab_id,
                    url: block_redirect_url(&self.pages.block_page, &url),
                });
            }
            Verdict::Allow(reason) => {
                debug!(tab_id = %tab_id, url = %url, reason = ?reason, "Navigation allowed");
            }
        }

        effects
    }

    fn on_message(
        &mut self,
        sender_tab_id: Option<TabId>,
        message: RuntimeMessage,
        now: DateTime<Local>,
    ) -> Vec<Effect> {
        let RuntimeMessage::ScheduleClose {
            original_url,
            minutes,
        } = message
        else {
            debug!("Ignoring unknown runtime message");
            return Vec::new();
        };

        let Some(tab_id) = sender_tab_id else {
            debug!("Ignoring scheduleClose without a sender tab");
            return Vec::new();
        };

        let delay = match minutes_to_millis(minutes) {
            Some(ms) => Duration::from_millis(ms.unsigned_abs()),
            // Zero, negative or sub-millisecond lengths close the tab at once
            None if minutes.is_finite() && minutes < 1.0 => Duration::ZERO,
            None => {
                warn!(tab_id = %tab_id, minutes, "Ignoring scheduleClose with invalid minutes");
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        if let Some(entry) = self
            .whitelist
            .add(&original_url, tab_id, minutes, now.timestamp_millis())
        {
            info!(tab_id = %tab_id, domain = %entry.domain, minutes, "Snooze granted");
            effects.push(Effect::Persist(self.whitelist.snapshot()));
        }

        // The tab closes when the snooze runs out, even if no domain could be
        // extracted from the URL.
        effects.push(Effect::ScheduleTabClose { tab_id, delay });

        effects
    }

    fn on_timer(&mut self, name: &str, now: DateTime<Local>) -> Vec<Effect> {
        match SchedulerAdapter::route(name) {
            Some(TimerName::WhitelistCleanup) => {
                let removed = self.whitelist.prune(now.timestamp_millis());
                debug!(removed, "Whitelist cleanup");
                vec![Effect::Persist(self.whitelist.snapshot())]
            }
            Some(TimerName::CloseTab(tab_id)) => vec![Effect::CloseTab { tab_id }],
            None => Vec::new(),
        }
    }

    fn on_storage_changed(&mut self, changes: BTreeMap<String, StorageChange>) -> Vec<Effect> {
        changes
            .into_iter()
            .filter_map(|(key, change)| match key.parse::<StorageKey>() {
                Ok(key) => self.rules.apply_change(key, &change),
                Err(e) => {
                    debug!(error = %e, "Ignoring change to unrelated key");
                    None
                }
            })
            .map(Effect::Persist)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use sitewarden_api::{Settings, WhitelistEntry};
    use sitewarden_store::SqliteStore;

    const BLOCK_PAGE: &str = "chrome-extension://abc/block/block.html";
    const CONFIG_PAGE: &str = "chrome-extension://abc/config/config.html";

    fn pages() -> PageUrls {
        PageUrls {
            block_page: BLOCK_PAGE.into(),
            config_page: CONFIG_PAGE.into(),
        }
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn engine_with(sites: &[&str]) -> CoreEngine {
        let mut engine = CoreEngine::new(pages(), Duration::from_secs(300));
        engine
            .rules
            .set_block_list(sites.iter().map(|s| s.to_string()).collect());
        engine
    }

    fn navigate(tab: i64, url: &str) -> CoreInput {
        CoreInput::Navigation {
            tab_id: TabId::new(tab),
            status: TabStatus::Loading,
            url: Some(url.into()),
        }
    }

    fn snooze(tab: Option<i64>, url: &str, minutes: f64) -> CoreInput {
        CoreInput::Message {
            sender_tab_id: tab.map(TabId::new),
            message: RuntimeMessage::ScheduleClose {
                original_url: url.into(),
                minutes,
            },
        }
    }

    fn redirects(effects: &[Effect]) -> Vec<&Effect> {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Redirect { .. }))
            .collect()
    }

    #[test]
    fn blocked_navigation_redirects_with_encoded_url() {
        let mut engine = engine_with(&["example.com"]);
        let effects = engine.handle(navigate(7, "https://example.com/page"), noon());

        assert_eq!(
            redirects(&effects),
            vec![&Effect::Redirect {
                tab_id: TabId::new(7),
                url: format!("{BLOCK_PAGE}?url=https%3A%2F%2Fexample.com%2Fpage"),
            }]
        );
    }

    #[test]
    fn navigation_prunes_and_persists_whitelist() {
        let mut engine = engine_with(&[]);
        let effects = engine.handle(navigate(1, "https://rust-lang.org/"), noon());

        assert_eq!(effects, vec![Effect::Persist(StorageWrite::Whitelist(Vec::new()))]);
    }

    #[test]
    fn only_loading_updates_are_checked() {
        let mut engine = engine_with(&["example.com"]);
        let effects = engine.handle(
            CoreInput::Navigation {
                tab_id: TabId::new(1),
                status: TabStatus::Complete,
                url: Some("https://example.com/".into()),
            },
            noon(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn block_page_navigation_is_never_redirected() {
        let mut engine = engine_with(&["example.com", "abc"]);
        let url = block_redirect_url(BLOCK_PAGE, "https://example.com/");
        assert!(engine.handle(navigate(1, &url), noon()).is_empty());
    }

    #[test]
    fn snooze_allows_then_expires() {
        let mut engine = engine_with(&["example.com"]);
        let t = noon();

        let effects = engine.handle(snooze(Some(4), "https://example.com/page", 10.0), t);
        assert!(effects.contains(&Effect::ScheduleTabClose {
            tab_id: TabId::new(4),
            delay: Duration::from_secs(600),
        }));
        assert!(matches!(effects[0], Effect::Persist(StorageWrite::Whitelist(ref e)) if e.len() == 1));

        let at_5 = engine.handle(navigate(4, "https://example.com/page"), t + minutes(5));
        assert!(redirects(&at_5).is_empty());

        let other_tab = engine.handle(navigate(5, "https://example.com/page"), t + minutes(5));
        assert_eq!(redirects(&other_tab).len(), 1);

        let at_11 = engine.handle(navigate(4, "https://example.com/page"), t + minutes(11));
        assert_eq!(redirects(&at_11).len(), 1);
        assert!(engine.whitelist().is_empty());
    }

    #[test]
    fn resnooze_replaces_entry_and_adds_timer() {
        let mut engine = engine_with(&["example.com"]);
        let t = noon();

        engine.handle(snooze(Some(4), "https://example.com", 10.0), t);
        let effects = engine.handle(snooze(Some(4), "https://example.com/x", 2.0), t);

        assert_eq!(engine.whitelist().len(), 1);
        assert_eq!(
            engine.whitelist().entries()[0].expire,
            (t + minutes(2)).timestamp_millis()
        );
        assert!(effects.contains(&Effect::ScheduleTabClose {
            tab_id: TabId::new(4),
            delay: Duration::from_secs(120),
        }));
    }

    #[test]
    fn snooze_without_sender_or_with_non_finite_minutes_is_ignored() {
        let mut engine = engine_with(&["example.com"]);

        assert!(engine.handle(snooze(None, "https://example.com", 5.0), noon()).is_empty());
        assert!(engine.handle(snooze(Some(1), "https://example.com", f64::NAN), noon()).is_empty());
        assert!(
            engine
                .handle(snooze(Some(1), "https://example.com", f64::INFINITY), noon())
                .is_empty()
        );
        assert!(engine.whitelist().is_empty());
    }

    #[test]
    fn non_positive_snooze_closes_tab_without_whitelisting() {
        let mut engine = engine_with(&["example.com"]);

        for minutes in [0.0, -1.0] {
            assert_eq!(
                engine.handle(snooze(Some(3), "https://example.com", minutes), noon()),
                vec![Effect::ScheduleTabClose {
                    tab_id: TabId::new(3),
                    delay: Duration::ZERO,
                }]
            );
        }
        assert!(engine.whitelist().is_empty());
    }

    #[test]
    fn snooze_of_domainless_url_still_schedules_close() {
        let mut engine = engine_with(&[]);
        let effects = engine.handle(snooze(Some(2), "", 1.0), noon());

        assert_eq!(
            effects,
            vec![Effect::ScheduleTabClose {
                tab_id: TabId::new(2),
                delay: Duration::from_secs(60),
            }]
        );
    }

    #[test]
    fn unknown_runtime_message_is_ignored() {
        let mut engine = engine_with(&[]);
        let effects = engine.handle(
            CoreInput::Message {
                sender_tab_id: Some(TabId::new(1)),
                message: RuntimeMessage::Unknown,
            },
            noon(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn timers_route_to_prune_or_close() {
        let mut engine = engine_with(&[]);
        let t = noon();
        engine.handle(snooze(Some(1), "https://a.com", 1.0), t);

        let effects = engine.handle(
            CoreInput::TimerFired {
                name: "whitelistCleanup".into(),
            },
            t + minutes(2),
        );
        assert_eq!(effects, vec![Effect::Persist(StorageWrite::Whitelist(Vec::new()))]);

        let effects = engine.handle(
            CoreInput::TimerFired {
                name: "closeTab-1".into(),
            },
            t,
        );
        assert_eq!(effects, vec![Effect::CloseTab { tab_id: TabId::new(1) }]);

        let effects = engine.handle(
            CoreInput::TimerFired {
                name: "closeTab-".into(),
            },
            t,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn storage_change_replaces_rules_and_mirrors() {
        let mut engine = engine_with(&[]);
        let mut changes = BTreeMap::new();
        changes.insert(
            "blockedSites".to_string(),
            StorageChange {
                new_value: Some(json!(["example.com"])),
            },
        );
        changes.insert(
            "unrelated".to_string(),
            StorageChange {
                new_value: Some(json!(1)),
            },
        );

        let effects = engine.handle(CoreInput::StorageChanged { changes }, noon());
        assert_eq!(
            effects,
            vec![Effect::Persist(StorageWrite::BlockedSites(vec!["example.com".into()]))]
        );

        let effects = engine.handle(navigate(1, "https://example.com/"), noon());
        assert_eq!(redirects(&effects).len(), 1);
    }

    #[test]
    fn settings_change_applies_window() {
        let mut engine = engine_with(&["example.com"]);
        let mut changes = BTreeMap::new();
        changes.insert(
            "settings".to_string(),
            StorageChange {
                new_value: Some(json!({"timeSlotsEnabled": true, "timeFrom": "08:00", "timeTo": "09:00"})),
            },
        );
        engine.handle(CoreInput::StorageChanged { changes }, noon());

        let effects = engine.handle(navigate(1, "https://example.com/"), noon());
        assert!(redirects(&effects).is_empty());
    }

    #[test]
    fn toolbar_opens_config_page() {
        let mut engine = engine_with(&[]);
        assert_eq!(
            engine.handle(CoreInput::ToolbarClicked, noon()),
            vec![Effect::OpenTab {
                url: CONFIG_PAGE.into()
            }]
        );
    }

    #[test]
    fn initialize_loads_in_order_and_prunes() {
        let store = SqliteStore::in_memory().unwrap();
        let now = noon();
        let live = WhitelistEntry {
            domain: "a.com".into(),
            expire: (now + minutes(1)).timestamp_millis(),
            tab_id: TabId::new(1),
        };
        let expired = WhitelistEntry {
            domain: "b.com".into(),
            expire: now.timestamp_millis(),
            tab_id: TabId::new(1),
        };
        store
            .apply(&StorageWrite::Whitelist(vec![live.clone(), expired]))
            .unwrap();
        store
            .set_raw(StorageKey::BlockedSites, &json!(["example.com"]))
            .unwrap();

        let mut engine = CoreEngine::new(pages(), Duration::from_secs(300));
        let effects = engine
            .initialize(&store, &SeedConfig::default(), now)
            .unwrap();

        assert_eq!(engine.rules().block_list(), ["example.com"]);
        assert_eq!(engine.rules().settings(), &Settings::default());
        assert_eq!(
            effects,
            vec![
                Effect::Persist(StorageWrite::Whitelist(vec![live])),
                Effect::ScheduleCleanup {
                    period: Duration::from_secs(300)
                },
            ]
        );
    }

    #[test]
    fn seeds_fill_only_missing_keys() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set_raw(StorageKey::BlockedSites, &json!(["stored.com"]))
            .unwrap();
        let seed = SeedConfig {
            blocked_sites: Some(vec!["seed.com".into()]),
            settings: Some(Settings {
                time_slots_enabled: true,
                ..Settings::default()
            }),
        };

        let mut engine = CoreEngine::new(pages(), Duration::from_secs(300));
        let effects = engine.initialize(&store, &seed, noon()).unwrap();

        assert_eq!(engine.rules().block_list(), ["stored.com"]);
        assert!(engine.rules().settings().time_slots_enabled);
        assert!(matches!(effects[0], Effect::Persist(StorageWrite::Settings(_))));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::Persist(StorageWrite::BlockedSites(_)))));
    }
}
