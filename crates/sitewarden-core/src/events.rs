//! Engine inputs and effects

use sitewarden_api::{BrowserMessage, RuntimeMessage, StorageChange, TabStatus};
use sitewarden_host_api::AlarmFired;
use sitewarden_store::StorageWrite;
use sitewarden_util::TabId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything the engine reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum CoreInput {
    /// A tab started or finished loading a URL
    Navigation {
        tab_id: TabId,
        status: TabStatus,
        url: Option<String>,
    },

    /// A runtime message from an extension page
    Message {
        sender_tab_id: Option<TabId>,
        message: RuntimeMessage,
    },

    /// A named timer fired
    TimerFired { name: String },

    /// Storage keys changed in another context
    StorageChanged {
        changes: BTreeMap<String, StorageChange>,
    },

    /// Toolbar button pressed
    ToolbarClicked,
}

impl CoreInput {
    /// Map a browser message to an engine input. Command replies are consumed
    /// by the host adapter and have no engine counterpart.
    pub fn from_browser(message: BrowserMessage) -> Option<Self> {
        let input = match message {
            BrowserMessage::TabUpdated {
                tab_id,
                status,
                url,
            } => CoreInput::Navigation {
                tab_id,
                status,
                url,
            },
            BrowserMessage::RuntimeMessage {
                sender_tab_id,
                message,
            } => CoreInput::Message {
                sender_tab_id,
                message,
            },
            BrowserMessage::Alarm { name } => CoreInput::TimerFired { name },
            BrowserMessage::StorageChanged { changes } => CoreInput::StorageChanged { changes },
            BrowserMessage::ActionClicked => CoreInput::ToolbarClicked,
            BrowserMessage::Reply { .. } => return None,
        };
        Some(input)
    }
}

impl From<AlarmFired> for CoreInput {
    fn from(fired: AlarmFired) -> Self {
        CoreInput::TimerFired { name: fired.name }
    }
}

/// Side effects requested by the engine, carried out by the executor
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Navigate the tab to the block page
    Redirect { tab_id: TabId, url: String },

    /// Close the tab; a tab that is already gone is fine
    CloseTab { tab_id: TabId },

    /// Register a one-shot `closeTab-<id>` timer
    ScheduleTabClose { tab_id: TabId, delay: Duration },

    /// Register (or replace) the periodic `whitelistCleanup` timer
    ScheduleCleanup { period: Duration },

    /// Queue a full snapshot write
    Persist(StorageWrite),

    /// Open a page in a new tab
    OpenTab { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_have_no_engine_input() {
        assert_eq!(
            CoreInput::from_browser(BrowserMessage::Reply {
                request_id: 1,
                error: None
            }),
            None
        );
    }

    #[test]
    fn browser_alarm_and_local_timer_are_the_same_input() {
        let from_browser = CoreInput::from_browser(BrowserMessage::Alarm {
            name: "whitelistCleanup".into(),
        });
        let from_local = CoreInput::from(AlarmFired {
            name: "whitelistCleanup".into(),
        });
        assert_eq!(from_browser, Some(from_local));
    }
}
