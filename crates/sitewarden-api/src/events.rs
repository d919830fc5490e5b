//! Inbound messages from the browser side

use serde::{Deserialize, Serialize};
use sitewarden_util::TabId;
use std::collections::BTreeMap;

use crate::StorageChange;

/// Everything the extension can send to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserMessage {
    /// `tabs.onUpdated`
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        status: TabStatus,
        #[serde(default)]
        url: Option<String>,
    },

    /// `runtime.onMessage`; `sender_tab_id` is absent for messages not sent from a tab
    RuntimeMessage {
        #[serde(default)]
        sender_tab_id: Option<TabId>,
        message: RuntimeMessage,
    },

    /// `alarms.onAlarm`, for setups where the browser owns the timers
    Alarm { name: String },

    /// `storage.onChanged`
    StorageChanged {
        changes: BTreeMap<String, StorageChange>,
    },

    /// `action.onClicked` (toolbar button)
    ActionClicked,

    /// Completion of a [`crate::HostRequest`]
    Reply {
        request_id: u64,
        #[serde(default)]
        error: Option<ReplyError>,
    },
}

/// Loading status carried by tab updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Payload of a runtime message, dispatched on `action`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RuntimeMessage {
    /// Sent by the block page when the user snoozes a site
    ScheduleClose { original_url: String, minutes: f64 },

    #[serde(other)]
    Unknown,
}

/// Failure reported by the extension for a host command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub kind: ReplyErrorKind,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyErrorKind {
    TabNotFound,
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tab_updated_parses_extension_shape() {
        let msg: BrowserMessage = serde_json::from_value(json!({
            "type": "tabUpdated",
            "tabId": 7,
            "status": "loading",
            "url": "https://example.com/page"
        }))
        .unwrap();

        assert_eq!(
            msg,
            BrowserMessage::TabUpdated {
                tab_id: TabId::new(7),
                status: TabStatus::Loading,
                url: Some("https://example.com/page".into()),
            }
        );
    }

    #[test]
    fn unknown_tab_status_is_tolerated() {
        let msg: BrowserMessage = serde_json::from_value(json!({
            "type": "tabUpdated",
            "tabId": 1,
            "status": "unloaded"
        }))
        .unwrap();

        assert!(matches!(
            msg,
            BrowserMessage::TabUpdated { status: TabStatus::Unknown, url: None, .. }
        ));
    }

    #[test]
    fn schedule_close_message_parses() {
        let msg: BrowserMessage = serde_json::from_value(json!({
            "type": "runtimeMessage",
            "senderTabId": 3,
            "message": {"action": "scheduleClose", "originalUrl": "https://example.com", "minutes": 10}
        }))
        .unwrap();

        let BrowserMessage::RuntimeMessage { sender_tab_id, message } = msg else {
            panic!("expected runtime message");
        };
        assert_eq!(sender_tab_id, Some(TabId::new(3)));
        assert_eq!(
            message,
            RuntimeMessage::ScheduleClose {
                original_url: "https://example.com".into(),
                minutes: 10.0,
            }
        );
    }

    #[test]
    fn unknown_action_maps_to_unknown() {
        let msg: RuntimeMessage =
            serde_json::from_value(json!({"action": "somethingElse", "x": 1})).unwrap();
        assert_eq!(msg, RuntimeMessage::Unknown);
    }

    #[test]
    fn storage_changed_keeps_removed_keys() {
        let msg: BrowserMessage = serde_json::from_value(json!({
            "type": "storageChanged",
            "changes": {
                "blockedSites": {"newValue": ["example.com"], "oldValue": []},
                "settings": {}
            }
        }))
        .unwrap();

        let BrowserMessage::StorageChanged { changes } = msg else {
            panic!("expected storage change");
        };
        assert_eq!(changes["blockedSites"].new_value, Some(json!(["example.com"])));
        assert_eq!(changes["settings"].new_value, None);
    }

    #[test]
    fn reply_error_kinds() {
        let msg: BrowserMessage = serde_json::from_value(json!({
            "type": "reply",
            "requestId": 9,
            "error": {"kind": "tabNotFound", "message": "No tab with id: 7."}
        }))
        .unwrap();
        let BrowserMessage::Reply { request_id, error } = msg else {
            panic!("expected reply");
        };
        assert_eq!(request_id, 9);
        assert_eq!(error.unwrap().kind, ReplyErrorKind::TabNotFound);

        let other: ReplyError =
            serde_json::from_value(json!({"kind": "permissionDenied"})).unwrap();
        assert_eq!(other.kind, ReplyErrorKind::Other);
    }
}
