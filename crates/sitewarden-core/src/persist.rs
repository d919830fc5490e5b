//! Single-writer persistence queue

use sitewarden_store::{StorageWrite, Store};
use sitewarden_util::RetryPolicy;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

enum PersistCommand {
    Write(StorageWrite),
    Flush(oneshot::Sender<()>),
}

/// Counters for the writer task
#[derive(Debug, Default)]
pub struct PersistStats {
    written: AtomicU64,
    dropped: AtomicU64,
}

impl PersistStats {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Writes given up on after exhausting the retry policy
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// FIFO queue drained by one writer task.
///
/// Each write is retried per the [`RetryPolicy`]; once attempts are exhausted
/// the write is logged at error level and dropped.
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistCommand>,
    stats: Arc<PersistStats>,
    task: JoinHandle<()>,
}

impl PersistQueue {
    /// Spawn the writer task
    pub fn start(store: Arc<dyn Store>, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(PersistStats::default());
        let task = tokio::spawn(run_writer(store, policy, rx, stats.clone()));

        Self { tx, stats, task }
    }

    /// Queue a write; returns immediately
    pub fn enqueue(&self, write: StorageWrite) {
        let key = write.key();
        if self.tx.send(PersistCommand::Write(write)).is_err() {
            error!(key = %key, "Persist queue closed, write lost");
        }
    }

    /// Wait until every write queued before this call has been handled
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    pub fn stats(&self) -> &PersistStats {
        &self.stats
    }

    /// Drain outstanding writes and stop the writer
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            error!(error = %e, "Persist writer task failed");
        }
    }
}

async fn run_writer(
    store: Arc<dyn Store>,
    policy: RetryPolicy,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
    stats: Arc<PersistStats>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            PersistCommand::Write(write) => {
                if write_with_retry(store.as_ref(), &policy, &write).await {
                    stats.written.fetch_add(1, Ordering::Relaxed);
                } else {
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            PersistCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Persist writer stopped");
}

/// Apply `write`, retrying with backoff. Returns whether it landed.
pub async fn write_with_retry(store: &dyn Store, policy: &RetryPolicy, write: &StorageWrite) -> bool {
    let key = write.key();
    let mut attempt = 1;

    while let Some(delay) = policy.delay_before(attempt) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match store.apply(write) {
            Ok(()) => {
                debug!(key = %key, attempt, "Persisted");
                return true;
            }
            Err(e) => {
                warn!(key = %key, attempt, error = %e, "Persist attempt failed");
            }
        }
        attempt += 1;
    }

    error!(
        key = %key,
        attempts = attempt - 1,
        "Giving up on write after exhausting retries"
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewarden_api::{Settings, StorageKey};
    use sitewarden_store::{SqliteStore, StoreError, StoreResult};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    /// Fails the first `failures` writes, then delegates
    struct FlakyStore {
        inner: SqliteStore,
        failures: u32,
        attempts: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: SqliteStore::in_memory().unwrap(),
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    impl Store for FlakyStore {
        fn get_raw(&self, key: StorageKey) -> StoreResult<Option<serde_json::Value>> {
            self.inner.get_raw(key)
        }

        fn set_raw(&self, key: StorageKey, value: &serde_json::Value) -> StoreResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(StoreError::Database("disk I/O error".into()));
            }
            self.inner.set_raw(key, value)
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            2.0,
            Duration::from_millis(4),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn writes_land_in_order() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let queue = PersistQueue::start(store.clone(), RetryPolicy::default());

        queue.enqueue(StorageWrite::BlockedSites(vec!["a.com".into()]));
        queue.enqueue(StorageWrite::BlockedSites(vec!["b.com".into()]));
        queue.flush().await;

        assert_eq!(store.load_blocked_sites().unwrap(), vec!["b.com".to_string()]);
        assert_eq!(queue.stats().written(), 2);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let queue = PersistQueue::start(store.clone(), fast_policy(3));

        queue.enqueue(StorageWrite::Settings(Settings::default()));
        queue.flush().await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
        assert!(store.contains(StorageKey::Settings).unwrap());
        assert_eq!(queue.stats().dropped(), 0);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_write() {
        let store = Arc::new(FlakyStore::new(10));
        let queue = PersistQueue::start(store.clone(), fast_policy(3));

        queue.enqueue(StorageWrite::Settings(Settings::default()));
        queue.enqueue(StorageWrite::BlockedSites(Vec::new()));
        queue.flush().await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 6);
        assert_eq!(queue.stats().dropped(), 2);
        assert!(!store.contains(StorageKey::Settings).unwrap());
    }

    #[tokio::test]
    async fn shutdown_drains_pending_writes() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let queue = PersistQueue::start(store.clone(), RetryPolicy::default());

        queue.enqueue(StorageWrite::BlockedSites(vec!["late.com".into()]));
        queue.shutdown().await;

        assert_eq!(store.load_blocked_sites().unwrap(), vec!["late.com".to_string()]);
    }
}
