//! Timer naming, registration and routing

use sitewarden_api::TimerName;
use sitewarden_host_api::{AlarmScheduler, BrowserHost, HostError, HostResult};
use sitewarden_util::TabId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a fired `closeTab-<id>` timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// The tab was closed before the timer fired
    AlreadyGone,
    /// Any other host failure; logged, not retried
    Failed,
}

/// Registers named timers with the alarm backend
pub struct SchedulerAdapter {
    alarms: Arc<dyn AlarmScheduler>,
}

impl SchedulerAdapter {
    pub fn new(alarms: Arc<dyn AlarmScheduler>) -> Self {
        Self { alarms }
    }

    /// Periodic whitelist cleanup; replaces any previous registration
    pub fn schedule_cleanup(&self, period: Duration) -> HostResult<()> {
        let name = TimerName::WhitelistCleanup.to_string();
        self.alarms.schedule_periodic(&name, period)?;
        info!(name = %name, period = ?period, "Cleanup timer registered");
        Ok(())
    }

    /// One-shot close for `tab_id`. Earlier registrations for the same tab
    /// are left in place.
    pub fn schedule_tab_close(&self, tab_id: TabId, delay: Duration) -> HostResult<()> {
        let name = TimerName::CloseTab(tab_id).to_string();
        self.alarms.schedule_once(&name, delay)?;
        debug!(name = %name, delay = ?delay, "Tab close timer registered");
        Ok(())
    }

    /// Identify a fired timer; unknown names are logged and yield `None`
    pub fn route(name: &str) -> Option<TimerName> {
        match name.parse::<TimerName>() {
            Ok(timer) => Some(timer),
            Err(e) => {
                warn!(name, error = %e, "Ignoring unknown timer");
                None
            }
        }
    }

    /// Close a tab for a fired timer
    pub async fn close_tab(browser: &dyn BrowserHost, tab_id: TabId) -> CloseOutcome {
        match browser.remove_tab(tab_id).await {
            Ok(()) => {
                info!(tab_id = %tab_id, "Snoozed tab closed");
                CloseOutcome::Closed
            }
            Err(HostError::TabNotFound(_)) => {
                debug!(tab_id = %tab_id, "Tab already closed");
                CloseOutcome::AlreadyGone
            }
            Err(e) => {
                warn!(tab_id = %tab_id, error = %e, "Failed to close tab");
                CloseOutcome::Failed
            }
        }
    }
}
