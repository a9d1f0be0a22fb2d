//! Live bookkeeping for scheduled tasks: sleeping waiters and periodic
//! triggers.
//!
//! Both maps sit behind their own `Mutex`, and every lock is held only for a
//! single map operation. Nothing here sleeps or performs I/O while holding a
//! lock.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// First tick of a trigger started at `now`, or `None` when the timer
/// cannot represent two full periods from `now`.
fn first_tick_at(now: Instant, period: Duration) -> Option<Instant> {
    let first = now.checked_add(period)?;
    first.checked_add(period)?;
    Some(first)
}

/// Key of a pending waiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WaiterKey {
    /// Sleeping until the task's start (or next phase-aligned firing).
    Schedule(String),
    /// Sleeping until the task's validity window closes.
    Discard(String),
}

impl WaiterKey {
    pub fn task_id(&self) -> &str {
        match self {
            WaiterKey::Schedule(id) | WaiterKey::Discard(id) => id,
        }
    }
}

impl fmt::Display for WaiterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaiterKey::Schedule(id) => write!(f, "schedule_{id}"),
            WaiterKey::Discard(id) => write!(f, "discard_{id}"),
        }
    }
}

struct WaiterSlot {
    seq: u64,
    cancel: CancellationToken,
}

/// A live repeating trigger. Dropping the handle stops it.
#[derive(Debug)]
pub struct PeriodicHandle {
    period: Duration,
    cancel: CancellationToken,
}

impl PeriodicHandle {
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PeriodicHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Minimal repeating-trigger capability on top of the tokio timer.
pub struct PeriodicTrigger;

impl PeriodicTrigger {
    /// Call `on_tick` every `period`, first after one full period has
    /// elapsed, until the returned handle is stopped or dropped.
    pub fn start<F>(period: Duration, on_tick: F) -> PeriodicHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            let Some(first_tick) = first_tick_at(Instant::now(), period) else {
                warn!(
                    period_secs = period.as_secs(),
                    "period exceeds the timer range, trigger will never fire"
                );
                token.cancelled().await;
                return;
            };
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_tick(),
                }
            }
        });
        PeriodicHandle { period, cancel }
    }
}

/// Outcome of [`TimerRegistry::try_register_periodic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The id already had a periodic trigger; nothing was run.
    Conflict,
    /// The start callback ran and produced no trigger.
    OneShot,
    /// The start callback ran and its trigger is now recorded.
    Periodic,
}

/// Concurrency-safe home for pending waiters and periodic registrations.
#[derive(Default)]
pub struct TimerRegistry {
    waiters: Mutex<HashMap<WaiterKey, WaiterSlot>>,
    periodic: Mutex<HashMap<String, PeriodicHandle>>,
    next_seq: AtomicU64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn waiters(&self) -> MutexGuard<'_, HashMap<WaiterKey, WaiterSlot>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn periodic(&self) -> MutexGuard<'_, HashMap<String, PeriodicHandle>> {
        self.periodic.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a cancellable waiter under `key` that runs `on_fire` once `delay`
    /// has elapsed.
    ///
    /// A waiter already registered under the same key is cancelled and
    /// replaced. The waiter removes its own entry before its continuation
    /// runs, so the map only ever holds sleeping waiters.
    pub fn spawn_waiter<F, Fut>(self: &Arc<Self>, key: WaiterKey, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let replaced = self.waiters().insert(
            key.clone(),
            WaiterSlot {
                seq,
                cancel: cancel.clone(),
            },
        );
        if let Some(old) = replaced {
            warn!(key = %key, "replacing an existing waiter");
            old.cancel.cancel();
        }
        debug!(key = %key, delay_secs = delay.as_secs(), "waiter spawned");

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let fired = tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            registry.release_waiter(&key, seq);
            if fired && !cancel.is_cancelled() {
                debug!(key = %key, "waiter fired");
                on_fire().await;
            } else {
                debug!(key = %key, "waiter cancelled");
            }
        });
    }

    /// Drop the entry for `key` only if it still belongs to waiter `seq`.
    fn release_waiter(&self, key: &WaiterKey, seq: u64) {
        let mut waiters = self.waiters();
        if waiters.get(key).is_some_and(|slot| slot.seq == seq) {
            waiters.remove(key);
        }
    }

    /// Cancel and remove the waiter under `key`. Returns whether one existed.
    pub fn cancel_waiter(&self, key: &WaiterKey) -> bool {
        match self.waiters().remove(key) {
            Some(slot) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_waiter(&self, key: &WaiterKey) -> bool {
        self.waiters().contains_key(key)
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters().len()
    }

    /// Run `start` under the periodic-registration lock unless `id` already
    /// has a live trigger. A handle returned by `start` is recorded for `id`.
    ///
    /// Holding the lock across `start` is what keeps two concurrent callers
    /// from both registering the same id, so `start` must not block.
    pub fn try_register_periodic<F>(&self, id: &str, start: F) -> Registration
    where
        F: FnOnce() -> Option<PeriodicHandle>,
    {
        let mut periodic = self.periodic();
        if periodic.contains_key(id) {
            return Registration::Conflict;
        }
        match start() {
            Some(handle) => {
                periodic.insert(id.to_string(), handle);
                Registration::Periodic
            }
            None => Registration::OneShot,
        }
    }

    /// Stop and forget the periodic trigger for `id`. Returns whether one
    /// existed.
    pub fn remove_periodic(&self, id: &str) -> bool {
        let removed = self.periodic().remove(id);
        match removed {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn has_periodic(&self, id: &str) -> bool {
        self.periodic().contains_key(id)
    }

    pub fn periodic_count(&self) -> usize {
        self.periodic().len()
    }

    /// Cancel every waiter and stop every periodic trigger.
    pub fn clear(&self) {
        let waiters: Vec<WaiterSlot> = self.waiters().drain().map(|(_, slot)| slot).collect();
        for slot in &waiters {
            slot.cancel.cancel();
        }
        let periodic: Vec<PeriodicHandle> = self.periodic().drain().map(|(_, h)| h).collect();
        info!(
            waiters = waiters.len(),
            periodic = periodic.len(),
            "timer registry cleared"
        );
    }
}
