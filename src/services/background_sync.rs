//! Task bookkeeping for the engine's background triggers.
//!
//! Three kinds of task exist: the credential poll (running from `start`
//! until `shutdown`), the auto-sync interval timer (armed only while a
//! usable credential exists and auto-sync is enabled) and at most one
//! pending debounce sleeper. None of them runs a cycle inline; they spawn
//! detached cycles so aborting a task never cancels work in flight.
//!
//! Tasks hold a [`WeakEngine`] and upgrade it per wake-up, so dropping the
//! last engine handle ends them even without `shutdown`.

use crate::models::SyncTrigger;
use crate::services::sync_engine::{SyncEngine, WeakEngine};
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handles of the running background tasks
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    monitor: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    debounce: Mutex<Option<JoinHandle<()>>>,
    /// Epoch millis of the next timer tick, 0 while disarmed
    next_sync_at: AtomicI64,
}

/// Replaces the task in `slot`, aborting the previous one
fn replace(slot: &Mutex<Option<JoinHandle<()>>>, handle: Option<JoinHandle<()>>) {
    if let Ok(mut guard) = slot.lock() {
        if let Some(previous) = std::mem::replace(&mut *guard, handle) {
            previous.abort();
        }
    }
}

fn is_set(slot: &Mutex<Option<JoinHandle<()>>>) -> bool {
    slot.lock()
        .map(|guard| guard.as_ref().is_some_and(|h| !h.is_finished()))
        .unwrap_or(false)
}

impl Scheduler {
    pub fn is_monitoring(&self) -> bool {
        is_set(&self.monitor)
    }

    pub fn is_timer_armed(&self) -> bool {
        is_set(&self.timer)
    }

    fn plan_next_tick(&self, after: Duration) {
        let at = Utc::now().timestamp_millis() + after.as_millis() as i64;
        self.next_sync_at.store(at, Ordering::SeqCst);
    }

    /// Seconds until the next timer tick, `None` while disarmed
    pub fn next_sync_eta_seconds(&self) -> Option<u64> {
        if !self.is_timer_armed() {
            return None;
        }
        let target = self.next_sync_at.load(Ordering::SeqCst);
        let now = Utc::now().timestamp_millis();
        if target == 0 || target <= now {
            Some(0)
        } else {
            Some(((target - now) / 1000) as u64)
        }
    }

    /// Starts the credential poll; a second call is a no-op
    pub fn start(&self, engine: &SyncEngine) -> bool {
        if self.is_monitoring() {
            return false;
        }
        let every = engine.config().auth_poll_interval();
        let handle = tokio::spawn(auth_monitor_loop(engine.downgrade(), every));
        replace(&self.monitor, Some(handle));
        true
    }

    /// Arms the interval timer unless it already runs
    pub fn arm_timer(&self, engine: &SyncEngine) {
        if self.is_timer_armed() {
            return;
        }
        let period = engine.config().auto_sync_interval();
        self.plan_next_tick(period);
        let handle = tokio::spawn(timer_loop(engine.downgrade(), period));
        replace(&self.timer, Some(handle));
        log::info!("Auto-sync armed, every {}s", period.as_secs());
    }

    pub fn disarm_timer(&self) {
        if self.is_timer_armed() {
            log::info!("Auto-sync disarmed");
        }
        replace(&self.timer, None);
        self.next_sync_at.store(0, Ordering::SeqCst);
    }

    /// (Re)starts the quiet period; a pending sleeper is dropped
    pub fn schedule_debounced(&self, engine: &SyncEngine) {
        let quiet = engine.config().debounce();
        let engine = engine.downgrade();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if let Some(engine) = engine.upgrade() {
                engine.spawn_cycle(SyncTrigger::DataChanged);
            }
        });
        replace(&self.debounce, Some(handle));
    }

    pub fn cancel_debounce(&self) {
        replace(&self.debounce, None);
    }

    /// Aborts every background task; cycles already spawned keep running
    pub fn shutdown(&self) {
        replace(&self.monitor, None);
        self.disarm_timer();
        self.cancel_debounce();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Re-evaluates the credential on a fixed cadence and reacts to edges only
async fn auth_monitor_loop(handle: WeakEngine, every: Duration) {
    let mut poll = tokio::time::interval(every);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut was_authenticated = false;

    loop {
        poll.tick().await;
        let Some(engine) = handle.upgrade() else {
            break;
        };
        let authenticated = engine.is_authenticated();
        if authenticated == was_authenticated {
            continue;
        }
        was_authenticated = authenticated;

        if authenticated {
            log::info!("Drive credential available");
            if engine.is_auto_sync_enabled() {
                engine.scheduler().arm_timer(&engine);
                engine.spawn_cycle(SyncTrigger::AuthRestored);
            }
        } else {
            log::info!("Drive credential lost or expired");
            engine.scheduler().disarm_timer();
        }
    }
}

async fn timer_loop(handle: WeakEngine, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(engine) = handle.upgrade() else {
            break;
        };
        engine.scheduler().plan_next_tick(period);
        engine.spawn_cycle(SyncTrigger::Timer);
    }
}
