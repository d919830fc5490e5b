//! Named timers
//!
//! Timer names are the only state the scheduler carries, so they are the
//! dispatch key when a timer fires.

use sitewarden_util::TabId;
use std::fmt;
use std::str::FromStr;

/// Name of the periodic whitelist cleanup timer
pub const WHITELIST_CLEANUP_TIMER: &str = "whitelistCleanup";

/// Prefix of the per-tab close timers (`closeTab-<tabId>`)
pub const CLOSE_TAB_TIMER_PREFIX: &str = "closeTab-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    WhitelistCleanup,
    CloseTab(TabId),
}

impl fmt::Display for TimerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerName::WhitelistCleanup => f.write_str(WHITELIST_CLEANUP_TIMER),
            TimerName::CloseTab(tab_id) => write!(f, "{CLOSE_TAB_TIMER_PREFIX}{tab_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized timer name: {0}")]
pub struct UnknownTimer(pub String);

impl FromStr for TimerName {
    type Err = UnknownTimer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WHITELIST_CLEANUP_TIMER {
            return Ok(TimerName::WhitelistCleanup);
        }

        s.strip_prefix(CLOSE_TAB_TIMER_PREFIX)
            .and_then(|id| id.parse::<TabId>().ok())
            .map(TimerName::CloseTab)
            .ok_or_else(|| UnknownTimer(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in [TimerName::WhitelistCleanup, TimerName::CloseTab(TabId::new(42))] {
            assert_eq!(name.to_string().parse::<TimerName>().unwrap(), name);
        }
        assert_eq!(TimerName::CloseTab(TabId::new(42)).to_string(), "closeTab-42");
    }

    #[test]
    fn rejects_unknown_and_malformed_names() {
        assert!("somethingElse".parse::<TimerName>().is_err());
        assert!("closeTab-".parse::<TimerName>().is_err());
        assert!("closeTab-abc".parse::<TimerName>().is_err());
        assert!("closeTab-7-8".parse::<TimerName>().is_err());
    }
}
