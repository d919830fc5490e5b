//! Browser adapter speaking to the extension over native messaging

use async_trait::async_trait;
use sitewarden_api::{BrowserMessage, HostCommand, HostRequest, ReplyError, ReplyErrorKind};
use sitewarden_host_api::{BrowserHost, HostError, HostResult};
use sitewarden_ipc::{IpcError, NativeMessagingServer};
use sitewarden_util::TabId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<Option<ReplyError>>>>>;

/// Browser host backed by the extension on the other end of stdio
pub struct NativeBrowserHost {
    server: NativeMessagingServer,
    pending: PendingReplies,
    next_request_id: AtomicU64,
    command_timeout: Duration,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<BrowserMessage>>>,
    router_task: JoinHandle<()>,
}

impl NativeBrowserHost {
    /// Wrap a running server. Replies are routed to waiting commands; every
    /// other message goes to [`BrowserHost::subscribe`].
    pub async fn new(server: NativeMessagingServer, command_timeout: Duration) -> HostResult<Self> {
        let inbound = server
            .take_message_receiver()
            .await
            .ok_or_else(|| HostError::Internal("message receiver already taken".into()))?;

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let router_task = tokio::spawn(route_messages(inbound, event_tx, pending.clone()));

        Ok(Self {
            server,
            pending,
            next_request_id: AtomicU64::new(1),
            command_timeout,
            event_rx: Mutex::new(Some(event_rx)),
            router_task,
        })
    }

    #[cfg(test)]
    fn pending_commands(&self) -> usize {
        lock(&self.pending).len()
    }

    async fn execute(&self, command: HostCommand) -> HostResult<()> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(request_id, reply_tx);

        let request = HostRequest::new(request_id, command);
        debug!(request_id, command = ?request.command, "Sending command to browser");

        if let Err(e) = self.server.send(&request) {
            lock(&self.pending).remove(&request_id);
            return Err(match e {
                IpcError::ConnectionClosed => HostError::Disconnected,
                other => HostError::Internal(other.to_string()),
            });
        }

        match tokio::time::timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(None)) => Ok(()),
            Ok(Ok(Some(error))) => Err(reply_error(&request.command, error)),
            Ok(Err(_)) => Err(HostError::Disconnected),
            Err(_) => {
                lock(&self.pending).remove(&request_id);
                warn!(request_id, timeout = ?self.command_timeout, "Browser did not reply");
                Err(HostError::Timeout(self.command_timeout))
            }
        }
    }
}

impl Drop for NativeBrowserHost {
    fn drop(&mut self) {
        self.router_task.abort();
    }
}

#[async_trait]
impl BrowserHost for NativeBrowserHost {
    async fn update_tab(&self, tab_id: TabId, url: &str) -> HostResult<()> {
        self.execute(HostCommand::UpdateTab {
            tab_id,
            url: url.to_string(),
        })
        .await
    }

    async fn remove_tab(&self, tab_id: TabId) -> HostResult<()> {
        self.execute(HostCommand::RemoveTab { tab_id }).await
    }

    async fn create_tab(&self, url: &str) -> HostResult<()> {
        self.execute(HostCommand::CreateTab {
            url: url.to_string(),
        })
        .await
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserMessage> {
        match lock(&self.event_rx).take() {
            Some(rx) => rx,
            None => {
                warn!("Browser events already subscribed; returning closed receiver");
                mpsc::unbounded_channel().1
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.server.is_connected() && !self.router_task.is_finished()
    }
}

async fn route_messages(
    mut inbound: mpsc::UnboundedReceiver<BrowserMessage>,
    event_tx: mpsc::UnboundedSender<BrowserMessage>,
    pending: PendingReplies,
) {
    while let Some(message) = inbound.recv().await {
        match message {
            BrowserMessage::Reply { request_id, error } => {
                match lock(&pending).remove(&request_id) {
                    Some(reply_tx) => {
                        let _ = reply_tx.send(error);
                    }
                    None => debug!(request_id, "Reply for unknown or expired request"),
                }
            }
            other => {
                if event_tx.send(other).is_err() {
                    debug!("No browser event subscriber");
                }
            }
        }
    }

    // Waiting commands see a dropped sender and report Disconnected
    lock(&pending).clear();
    debug!("Browser message router stopped");
}

fn reply_error(command: &HostCommand, error: ReplyError) -> HostError {
    match (error.kind, command) {
        (ReplyErrorKind::TabNotFound, HostCommand::UpdateTab { tab_id, .. })
        | (ReplyErrorKind::TabNotFound, HostCommand::RemoveTab { tab_id }) => {
            HostError::TabNotFound(*tab_id)
        }
        _ => HostError::Rejected(error.message),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
