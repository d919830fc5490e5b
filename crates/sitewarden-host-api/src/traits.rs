//! Host adapter traits

use async_trait::async_trait;
use sitewarden_api::BrowserMessage;
use sitewarden_util::TabId;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The tab no longer exists (closed by the user or the browser)
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Command rejected by browser: {0}")]
    Rejected(String),

    #[error("Timed out waiting for browser after {0:?}")]
    Timeout(Duration),

    #[error("Browser connection closed")]
    Disconnected,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Tab operations - implemented by browser adapters
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Navigate `tab_id` to `url`
    async fn update_tab(&self, tab_id: TabId, url: &str) -> HostResult<()>;

    /// Close `tab_id`; fails with [`HostError::TabNotFound`] if it is already gone
    async fn remove_tab(&self, tab_id: TabId) -> HostResult<()>;

    /// Open `url` in a new tab
    async fn create_tab(&self, url: &str) -> HostResult<()>;

    /// Subscribe to inbound browser events (tab updates, messages, storage changes)
    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserMessage>;

    /// Optional: check if the adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}

/// A named timer fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFired {
    pub name: String,
}

/// Named timers - implemented by scheduler adapters.
///
/// Registering a periodic timer under an existing name replaces it. One-shot
/// timers are independent: registering the same name twice fires twice.
pub trait AlarmScheduler: Send + Sync {
    /// Fire `name` every `period`, first after one period
    fn schedule_periodic(&self, name: &str, period: Duration) -> HostResult<()>;

    /// Fire `name` once after `delay`
    fn schedule_once(&self, name: &str, delay: Duration) -> HostResult<()>;

    /// Subscribe to fired timers
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AlarmFired>;

    /// Stop all pending timers
    fn shutdown(&self) {}
}
