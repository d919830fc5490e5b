//! Carries out engine effects against the host adapters

use sitewarden_host_api::{AlarmScheduler, BrowserHost, HostError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{Effect, PersistQueue, SchedulerAdapter};

/// Executes [`Effect`]s in order without waiting on the browser.
///
/// Timer registrations and persist writes are queued inline. Tab commands run
/// as detached tasks so an unanswered command never holds up the next event;
/// their failures are only logged.
pub struct EffectExecutor {
    browser: Arc<dyn BrowserHost>,
    alarms: Arc<dyn AlarmScheduler>,
    scheduler: SchedulerAdapter,
    persist: PersistQueue,
    in_flight: Arc<watch::Sender<usize>>,
}

/// Counts one running tab command; released on drop
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn start(counter: Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl EffectExecutor {
    pub fn new(
        browser: Arc<dyn BrowserHost>,
        alarms: Arc<dyn AlarmScheduler>,
        persist: PersistQueue,
    ) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            scheduler: SchedulerAdapter::new(alarms.clone()),
            browser,
            alarms,
            persist,
            in_flight: Arc::new(in_flight),
        }
    }

    pub fn persist(&self) -> &PersistQueue {
        &self.persist
    }

    /// Tab commands still waiting on the browser
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute_one(effect);
        }
    }

    /// Wait until every tab command started so far has completed
    pub async fn settle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn execute_one(&self, effect: Effect) {
        match effect {
            Effect::Redirect { tab_id, url } => {
                let browser = self.browser.clone();
                self.spawn_command(async move {
                    match browser.update_tab(tab_id, &url).await {
                        Ok(()) => debug!(tab_id = %tab_id, "Tab redirected to block page"),
                        Err(HostError::TabNotFound(_)) => {
                            debug!(tab_id = %tab_id, "Tab gone before redirect")
                        }
                        Err(e) => warn!(tab_id = %tab_id, error = %e, "Failed to redirect tab"),
                    }
                });
            }
            Effect::CloseTab { tab_id } => {
                let browser = self.browser.clone();
                self.spawn_command(async move {
                    SchedulerAdapter::close_tab(browser.as_ref(), tab_id).await;
                });
            }
            Effect::ScheduleTabClose { tab_id, delay } => {
                if let Err(e) = self.scheduler.schedule_tab_close(tab_id, delay) {
                    warn!(tab_id = %tab_id, error = %e, "Failed to schedule tab close");
                }
            }
            Effect::ScheduleCleanup { period } => {
                if let Err(e) = self.scheduler.schedule_cleanup(period) {
                    warn!(error = %e, "Failed to schedule whitelist cleanup");
                }
            }
            Effect::Persist(write) => self.persist.enqueue(write),
            Effect::OpenTab { url } => {
                let browser = self.browser.clone();
                self.spawn_command(async move {
                    match browser.create_tab(&url).await {
                        Ok(()) => info!(url = %url, "Opened tab"),
                        Err(e) => warn!(url = %url, error = %e, "Failed to open tab"),
                    }
                });
            }
        }
    }

    fn spawn_command<F>(&self, command: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InFlight::start(self.in_flight.clone());
        tokio::spawn(async move {
            let _guard = guard;
            command.await;
        });
    }

    /// Stop timers and drain the persist queue. Tab commands still waiting on
    /// the browser are abandoned.
    pub async fn shutdown(self) {
        let pending = self.in_flight();
        if pending > 0 {
            debug!(pending, "Abandoning unanswered tab commands");
        }
        self.alarms.shutdown();
        self.persist.shutdown().await;
    }
}
