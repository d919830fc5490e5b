//! Named timers on the tokio runtime

use sitewarden_host_api::{AlarmFired, AlarmScheduler, HostError, HostResult};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Alarm scheduler backed by tokio timers.
///
/// Periodic timers are keyed by name. One-shot timers are independent of each
/// other, so two registrations under one name fire twice.
pub struct TokioAlarmScheduler {
    periodic: Mutex<HashMap<String, JoinHandle<()>>>,
    one_shots: Mutex<Vec<JoinHandle<()>>>,
    fired_tx: mpsc::UnboundedSender<AlarmFired>,
    fired_rx: Mutex<Option<mpsc::UnboundedReceiver<AlarmFired>>>,
}

impl TokioAlarmScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            periodic: Mutex::new(HashMap::new()),
            one_shots: Mutex::new(Vec::new()),
            fired_tx: tx,
            fired_rx: Mutex::new(Some(rx)),
        }
    }

    /// Timers that have not yet fired (periodic timers always count)
    #[cfg(test)]
    fn pending(&self) -> usize {
        let mut one_shots = lock(&self.one_shots);
        one_shots.retain(|h| !h.is_finished());
        lock(&self.periodic).len() + one_shots.len()
    }
}

impl Default for TokioAlarmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmScheduler for TokioAlarmScheduler {
    fn schedule_periodic(&self, name: &str, period: Duration) -> HostResult<()> {
        if period.is_zero() {
            return Err(HostError::Internal(format!(
                "periodic timer {name} needs a non-zero period"
            )));
        }
        let handle = runtime()?;

        let fired_tx = self.fired_tx.clone();
        let timer_name = name.to_string();
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                trace!(name = %timer_name, "Periodic timer fired");
                if fired_tx
                    .send(AlarmFired {
                        name: timer_name.clone(),
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        if let Some(previous) = lock(&self.periodic).insert(name.to_string(), task) {
            debug!(name, "Replacing periodic timer");
            previous.abort();
        }
        debug!(name, period = ?period, "Periodic timer scheduled");
        Ok(())
    }

    fn schedule_once(&self, name: &str, delay: Duration) -> HostResult<()> {
        let handle = runtime()?;

        let fired_tx = self.fired_tx.clone();
        let timer_name = name.to_string();
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(name = %timer_name, "One-shot timer fired");
            let _ = fired_tx.send(AlarmFired { name: timer_name });
        });

        let mut one_shots = lock(&self.one_shots);
        one_shots.retain(|h| !h.is_finished());
        one_shots.push(task);
        debug!(name, delay = ?delay, "One-shot timer scheduled");
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AlarmFired> {
        lock(&self.fired_rx).take().unwrap_or_else(|| {
            debug!("Alarms already subscribed; returning closed receiver");
            mpsc::unbounded_channel().1
        })
    }

    fn shutdown(&self) {
        for (_, task) in lock(&self.periodic).drain() {
            task.abort();
        }
        for task in lock(&self.one_shots).drain(..) {
            task.abort();
        }
    }
}

impl Drop for TokioAlarmScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn runtime() -> HostResult<Handle> {
    Handle::try_current().map_err(|e| HostError::Internal(format!("no tokio runtime: {e}")))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
