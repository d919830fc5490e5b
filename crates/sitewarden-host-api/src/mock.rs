//! Mock adapters for testing

use async_trait::async_trait;
use sitewarden_api::{BrowserMessage, HostCommand};
use sitewarden_util::TabId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{AlarmFired, AlarmScheduler, BrowserHost, HostError, HostResult};

/// Mock browser for unit/integration testing.
///
/// Records every command it receives and keeps a set of open tabs so that
/// closing an unknown tab reports [`HostError::TabNotFound`].
pub struct MockBrowser {
    commands: Arc<Mutex<Vec<HostCommand>>>,
    open_tabs: Arc<Mutex<HashSet<TabId>>>,
    event_tx: mpsc::UnboundedSender<BrowserMessage>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<BrowserMessage>>>>,

    /// Configure every command to fail
    pub fail_commands: Arc<Mutex<bool>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            open_tabs: Arc::new(Mutex::new(HashSet::new())),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
            fail_commands: Arc::new(Mutex::new(false)),
        }
    }

    /// Mark tabs as open
    pub fn with_tabs(self, tabs: impl IntoIterator<Item = TabId>) -> Self {
        self.open_tabs.lock().unwrap().extend(tabs);
        self
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<HostCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn is_open(&self, tab_id: TabId) -> bool {
        self.open_tabs.lock().unwrap().contains(&tab_id)
    }

    /// Simulate the user closing a tab
    pub fn close_externally(&self, tab_id: TabId) {
        self.open_tabs.lock().unwrap().remove(&tab_id);
    }

    /// Inject an inbound browser event
    pub fn emit(&self, message: BrowserMessage) {
        let _ = self.event_tx.send(message);
    }

    fn record(&self, command: HostCommand) -> HostResult<()> {
        self.commands.lock().unwrap().push(command);
        if *self.fail_commands.lock().unwrap() {
            return Err(HostError::Rejected("Mock command failure".into()));
        }
        Ok(())
    }
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserHost for MockBrowser {
    async fn update_tab(&self, tab_id: TabId, url: &str) -> HostResult<()> {
        self.record(HostCommand::UpdateTab {
            tab_id,
            url: url.to_string(),
        })?;
        self.open_tabs.lock().unwrap().insert(tab_id);
        Ok(())
    }

    async fn remove_tab(&self, tab_id: TabId) -> HostResult<()> {
        self.record(HostCommand::RemoveTab { tab_id })?;
        if self.open_tabs.lock().unwrap().remove(&tab_id) {
            Ok(())
        } else {
            Err(HostError::TabNotFound(tab_id))
        }
    }

    async fn create_tab(&self, url: &str) -> HostResult<()> {
        self.record(HostCommand::CreateTab {
            url: url.to_string(),
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserMessage> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}

/// How a mock timer was registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTimer {
    Periodic { name: String, period: Duration },
    Once { name: String, delay: Duration },
}

/// Mock alarm scheduler: records registrations, fires only when told to
pub struct MockAlarms {
    registrations: Arc<Mutex<Vec<MockTimer>>>,
    fired_tx: mpsc::UnboundedSender<AlarmFired>,
    fired_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<AlarmFired>>>>,
}

impl MockAlarms {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            registrations: Arc::new(Mutex::new(Vec::new())),
            fired_tx: tx,
            fired_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    pub fn registrations(&self) -> Vec<MockTimer> {
        self.registrations.lock().unwrap().clone()
    }

    /// Simulate a timer firing
    pub fn fire(&self, name: &str) {
        let _ = self.fired_tx.send(AlarmFired {
            name: name.to_string(),
        });
    }
}

impl Default for MockAlarms {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmScheduler for MockAlarms {
    fn schedule_periodic(&self, name: &str, period: Duration) -> HostResult<()> {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.retain(|t| !matches!(t, MockTimer::Periodic { name: n, .. } if n == name));
        registrations.push(MockTimer::Periodic {
            name: name.to_string(),
            period,
        });
        Ok(())
    }

    fn schedule_once(&self, name: &str, delay: Duration) -> HostResult<()> {
        self.registrations.lock().unwrap().push(MockTimer::Once {
            name: name.to_string(),
            delay,
        });
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AlarmFired> {
        self.fired_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
