//! Outbound commands from the host to the extension

use serde::{Deserialize, Serialize};
use sitewarden_util::TabId;

use crate::API_VERSION;

/// Request wrapper with correlation ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequest {
    pub request_id: u64,
    pub api_version: u32,
    pub command: HostCommand,
}

impl HostRequest {
    pub fn new(request_id: u64, command: HostCommand) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Tab operations the extension carries out on the host's behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostCommand {
    /// `tabs.update(tabId, {url})`
    UpdateTab { tab_id: TabId, url: String },
    /// `tabs.remove(tabId)`
    RemoveTab { tab_id: TabId },
    /// `tabs.create({url})`
    CreateTab { url: String },
}
