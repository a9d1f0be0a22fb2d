use std::sync::Arc;
use std::time::Duration;

use cadence_core::{NewTask, Task};
use cadence_store::TaskStore;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::alert::AlertSender;
use crate::client::OutboundClient;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::executor::{ExecutionOutcome, RetryPolicy, TaskExecutor};
use crate::registry::{PeriodicTrigger, Registration, TimerRegistry, WaiterKey};
use crate::schedule::{discard_delay, placement, resume_delay, Placement};

/// Assembles a [`SchedulerEngine`] from its collaborators.
pub struct EngineBuilder {
    store: Arc<dyn TaskStore>,
    client: Arc<dyn OutboundClient>,
    alerts: Arc<dyn AlertSender>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl EngineBuilder {
    pub fn new(
        store: Arc<dyn TaskStore>,
        client: Arc<dyn OutboundClient>,
        alerts: Arc<dyn AlertSender>,
    ) -> Self {
        Self {
            store,
            client,
            alerts,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::default(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> SchedulerEngine {
        SchedulerEngine {
            inner: Arc::new(EngineInner {
                store: self.store,
                client: self.client,
                alerts: self.alerts,
                clock: self.clock,
                retry: self.retry,
                timers: Arc::new(TimerRegistry::new()),
            }),
        }
    }
}

struct EngineInner {
    store: Arc<dyn TaskStore>,
    client: Arc<dyn OutboundClient>,
    alerts: Arc<dyn AlertSender>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    timers: Arc<TimerRegistry>,
}

/// Keeps every enabled, unexpired task registered exactly as its schedule
/// implies.
///
/// Cheap to clone; clones share the same registries. Must be used from
/// inside a tokio runtime since scheduling spawns waiters and executions.
#[derive(Clone)]
pub struct SchedulerEngine {
    inner: Arc<EngineInner>,
}

impl SchedulerEngine {
    /// Load every active task from the store and place it.
    ///
    /// Only the initial fetch can fail; per-task placement never does.
    pub fn start(&self) -> Result<usize> {
        let tasks = self.inner.store.get_active(self.now_unix())?;
        let count = tasks.len();
        for task in tasks {
            self.schedule_task(task);
        }
        info!(count, "scheduler started");
        Ok(count)
    }

    /// Drop every live registration, then [`start`](Self::start) again.
    pub fn restart(&self) -> Result<usize> {
        info!("restarting scheduler");
        self.inner.timers.clear();
        self.start()
    }

    /// Place a task according to where `now` sits relative to its start.
    pub fn schedule_task(&self, task: Task) {
        let now = self.now_unix();
        match placement(now, &task) {
            Placement::Now => {
                self.schedule_task_now(task);
            }
            Placement::Delayed(delay) => {
                info!(task_id = %task.id, delay_secs = delay.as_secs(), "task scheduled for later");
                self.wait_then_run(task, delay);
            }
            Placement::Resume => self.resume_existing_task(task),
        }
    }

    /// Handle a task whose start instant has already passed.
    ///
    /// A one-shot runs immediately as a missed execution. A recurring task
    /// waits for its next phase-aligned firing, or is dropped when that
    /// firing would fall after its expiry.
    pub fn resume_existing_task(&self, task: Task) {
        if !task.is_recurring() {
            info!(task_id = %task.id, "running missed one-shot task");
            self.schedule_task_now(task);
            return;
        }

        let now = self.now_unix();
        match resume_delay(now, task.start_unix, task.end_unix, task.recur) {
            Some(delay) => {
                info!(task_id = %task.id, next_in_secs = delay.as_secs(), "resuming recurring task");
                self.wait_then_run(task, delay);
            }
            None => {
                info!(task_id = %task.id, "recurring task window closed, dropping");
            }
        }
    }

    fn wait_then_run(&self, task: Task, delay: Duration) {
        let engine = self.clone();
        let key = WaiterKey::Schedule(task.id.clone());
        self.inner.timers.spawn_waiter(key, delay, move || async move {
            engine.schedule_task_now(task);
        });
    }

    /// Run the task now and, if it recurs, register its periodic trigger and
    /// expiry waiter.
    ///
    /// A task that already has a periodic trigger is left alone.
    pub fn schedule_task_now(&self, task: Task) -> Registration {
        let now = self.now_unix();
        let recurring = task.is_recurring();

        let registration = self.inner.timers.try_register_periodic(&task.id, || {
            self.spawn_execution(task.clone());
            if !recurring {
                return None;
            }
            let engine = self.clone();
            let snapshot = task.clone();
            Some(PeriodicTrigger::start(
                Duration::from_secs(task.recur),
                move || {
                    engine.spawn_execution(snapshot.clone());
                },
            ))
        });

        match registration {
            Registration::Conflict => {
                error!(task_id = %task.id, "task already has a periodic registration, skipping");
            }
            Registration::OneShot => {}
            Registration::Periodic => {
                info!(task_id = %task.id, recur_secs = task.recur, "periodic trigger registered");
                let engine = self.clone();
                let id = task.id.clone();
                self.inner.timers.spawn_waiter(
                    WaiterKey::Discard(task.id.clone()),
                    discard_delay(now, task.end_unix),
                    move || async move {
                        info!(task_id = %id, "task expired");
                        engine.discard_task_now(&id);
                    },
                );
            }
        }
        registration
    }

    /// Cancel both waiters and the periodic trigger of `id`. Idempotent.
    pub fn discard_task_now(&self, id: &str) {
        let timers = &self.inner.timers;
        let schedule = timers.cancel_waiter(&WaiterKey::Schedule(id.to_string()));
        let discard = timers.cancel_waiter(&WaiterKey::Discard(id.to_string()));
        let periodic = timers.remove_periodic(id);

        if schedule || discard || periodic {
            info!(task_id = %id, schedule, discard, periodic, "task discarded");
        } else {
            info!(task_id = %id, "nothing registered for task, discard is a no-op");
        }
    }

    /// Spawn an independent execution of `task`. The engine never waits on
    /// it; the handle is only useful to callers that want the outcome.
    pub fn spawn_execution(&self, task: Task) -> JoinHandle<ExecutionOutcome> {
        let executor = TaskExecutor::new(
            task,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.client),
            Arc::clone(&self.inner.alerts),
            self.inner.retry,
        );
        tokio::spawn(executor.run())
    }

    pub fn get_one(&self, id: &str) -> Result<Task> {
        Ok(self.inner.store.get_one(id)?)
    }

    pub fn get_active(&self) -> Result<Vec<Task>> {
        Ok(self.inner.store.get_active(self.now_unix())?)
    }

    /// Validate, persist and schedule a new task. Returns its id.
    pub fn insert(&self, new_task: NewTask) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let task = new_task.into_task(id.clone(), self.inner.clock.now())?;
        self.inner.store.insert(&task)?;
        if task.enable {
            self.schedule_task(task);
        } else {
            info!(task_id = %id, "task inserted disabled, not scheduling");
        }
        Ok(id)
    }

    /// Remove live registrations, then the record itself.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.discard_task_now(id);
        self.inner.store.delete(id)?;
        Ok(())
    }

    /// Flip `enable` and bring the live registrations in line. Returns the
    /// new value.
    ///
    /// Finished one-shots and expired tasks only have the flag flipped.
    pub fn toggle(&self, id: &str) -> Result<bool> {
        let mut task = self.inner.store.get_one(id)?;
        let enable = !task.enable;
        self.inner.store.update_enable(id, enable)?;

        if task.is_finished_one_shot() {
            info!(task_id = %id, enable, "task already executed, registrations untouched");
            return Ok(enable);
        }
        if task.is_expired(self.now_unix()) {
            info!(task_id = %id, enable, "task expired, registrations untouched");
            return Ok(enable);
        }

        if enable {
            task.enable = true;
            self.schedule_task(task);
        } else {
            self.discard_task_now(id);
        }
        Ok(enable)
    }

    /// Run a task immediately, outside its schedule. Returns `false` when a
    /// finished one-shot or an expired task was left alone.
    pub fn execute_now(&self, id: &str) -> Result<bool> {
        let task = self.inner.store.get_one(id)?;
        if task.is_finished_one_shot() {
            info!(task_id = %id, "task already executed, skipping manual run");
            return Ok(false);
        }
        if task.is_expired(self.now_unix()) {
            info!(task_id = %id, "task expired, skipping manual run");
            return Ok(false);
        }
        info!(task_id = %id, "manual execution requested");
        self.spawn_execution(task);
        Ok(true)
    }

    /// Store reachability for health checks.
    pub fn ping_store(&self) -> bool {
        match self.inner.store.ping() {
            Ok(()) => true,
            Err(e) => {
                error!("task store unreachable: {e}");
                false
            }
        }
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    fn now_unix(&self) -> i64 {
        self.inner.clock.now_unix()
    }
}
