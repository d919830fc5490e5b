//! Blocking decisions

use chrono::{DateTime, Local};
use sitewarden_util::TabId;

use crate::{RuleStore, WhitelistManager};

/// Why a navigation is let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// No URL to judge
    EmptyUrl,
    /// The tab is already showing the block page
    BlockPage,
    /// Time slots are enabled and `now` is outside them
    OutsideWindow,
    /// A live snooze covers this domain in this tab
    Whitelisted,
    /// The host matches no block-list domain
    NotListed,
}

/// Outcome of evaluating a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow(AllowReason),
    Block,
}

impl Verdict {
    pub fn is_block(&self) -> bool {
        matches!(self, Verdict::Block)
    }
}

/// Pure blocking predicate over the current rules and whitelist
pub struct DecisionEngine<'a> {
    rules: &'a RuleStore,
    whitelist: &'a WhitelistManager,
    block_page: &'a str,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(rules: &'a RuleStore, whitelist: &'a WhitelistManager, block_page: &'a str) -> Self {
        Self {
            rules,
            whitelist,
            block_page,
        }
    }

    /// Decide whether navigating `tab_id` to `url` at `now` should be blocked
    pub fn evaluate(&self, url: Option<&str>, tab_id: TabId, now: &DateTime<Local>) -> Verdict {
        let url = match url {
            Some(url) if !url.is_empty() => url,
            _ => return Verdict::Allow(AllowReason::EmptyUrl),
        };

        if !self.block_page.is_empty() && url.starts_with(self.block_page) {
            return Verdict::Allow(AllowReason::BlockPage);
        }

        match self.rules.active_window() {
            Some(Some(window)) if !window.contains(now) => {
                return Verdict::Allow(AllowReason::OutsideWindow);
            }
            Some(None) => return Verdict::Allow(AllowReason::OutsideWindow),
            _ => {}
        }

        if self
            .whitelist
            .is_whitelisted(url, tab_id, now.timestamp_millis())
        {
            return Verdict::Allow(AllowReason::Whitelisted);
        }

        if self.rules.is_listed(url) {
            Verdict::Block
        } else {
            Verdict::Allow(AllowReason::NotListed)
        }
    }

    pub fn should_block(&self, url: Option<&str>, tab_id: TabId, now: &DateTime<Local>) -> bool {
        self.evaluate(url, tab_id, now).is_block()
    }
}

/// Block page URL carrying the original URL, component-encoded
pub fn block_redirect_url(block_page: &str, original_url: &str) -> String {
    format!("{block_page}?url={}", urlencoding::encode(original_url))
}
