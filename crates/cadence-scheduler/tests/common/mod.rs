// Test doubles shared by the scheduler integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{HttpMethod, NewTask, ScheduleKind, Task, TaskData, TaskStatus};
use cadence_scheduler::{
    AlertError, AlertSender, CallError, CallResponse, Clock, EngineBuilder, OutboundClient,
    RetryPolicy, SchedulerEngine,
};
use cadence_store::{SqliteTaskStore, TaskStore};
use chrono::{DateTime, TimeZone, Utc};

/// 2030-01-01T00:00:00Z
pub const T0: i64 = 1_893_456_000;
pub const HOUR: u64 = 3600;

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(unix: i64) -> Self {
        Self(Mutex::new(Utc.timestamp_opt(unix, 0).unwrap()))
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// SQLite store that also records every status write.
pub struct RecordingStore {
    inner: SqliteTaskStore,
    statuses: Mutex<Vec<(String, String, bool)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteTaskStore::in_memory().unwrap(),
            statuses: Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(&self) -> Vec<(String, String, bool)> {
        self.statuses.lock().unwrap().clone()
    }
}

impl TaskStore for RecordingStore {
    fn get_one(&self, id: &str) -> cadence_store::Result<Task> {
        self.inner.get_one(id)
    }

    fn get_active(&self, now_unix: i64) -> cadence_store::Result<Vec<Task>> {
        self.inner.get_active(now_unix)
    }

    fn insert(&self, task: &Task) -> cadence_store::Result<()> {
        self.inner.insert(task)
    }

    fn update_enable(&self, id: &str, enable: bool) -> cadence_store::Result<()> {
        self.inner.update_enable(id, enable)
    }

    fn update_task_status(
        &self,
        id: &str,
        exception_message: &str,
        is_complete: bool,
    ) -> cadence_store::Result<()> {
        self.statuses.lock().unwrap().push((
            id.to_string(),
            exception_message.to_string(),
            is_complete,
        ));
        self.inner.update_task_status(id, exception_message, is_complete)
    }

    fn delete(&self, id: &str) -> cadence_store::Result<()> {
        self.inner.delete(id)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16, &'static str),
    TransportError,
    /// Never answers within any sane deadline.
    Hang,
}

pub const OK: Reply = Reply::Status(200, "OK");
pub const UNAVAILABLE: Reply = Reply::Status(503, "Service Unavailable");

/// Plays back scripted replies, then repeats `fallback`.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(fallback: Reply) -> Self {
        Self::scripted(Vec::new(), fallback)
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutboundClient for ScriptedClient {
    async fn call(&self, _data: &TaskData) -> Result<CallResponse, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match reply {
            Reply::Status(code, reason) => Ok(CallResponse::new(code, Some(reason))),
            Reply::TransportError => Err(CallError::InvalidUrl("connection refused".into())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok(CallResponse::new(200, Some("OK")))
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    sent: Mutex<Vec<(String, String)>>,
    reject: bool,
}

impl RecordingAlerts {
    /// Records every alert, then answers as if the webhook refused it.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSender for RecordingAlerts {
    async fn send_alert(&self, task: &Task, error_text: &str) -> Result<(), AlertError> {
        self.sent
            .lock()
            .unwrap()
            .push((task.id.clone(), error_text.to_string()));
        if self.reject {
            return Err(AlertError::Rejected { status: 500 });
        }
        Ok(())
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(String::from)
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events into a [`LogCapture`] until the guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let logs = LogCapture::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

pub fn no_jitter() -> RetryPolicy {
    RetryPolicy {
        max_jitter: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

pub struct Harness {
    pub engine: SchedulerEngine,
    pub store: Arc<RecordingStore>,
    pub client: Arc<ScriptedClient>,
    pub alerts: Arc<RecordingAlerts>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(client: ScriptedClient) -> Self {
        let store = Arc::new(RecordingStore::new());
        let client = Arc::new(client);
        let alerts = Arc::new(RecordingAlerts::default());
        let clock = Arc::new(ManualClock::at(T0));
        let engine = EngineBuilder::new(store.clone(), client.clone(), alerts.clone())
            .clock(clock.clone())
            .retry_policy(no_jitter())
            .build();
        Self {
            engine,
            store,
            client,
            alerts,
            clock,
        }
    }

    /// Persist a task directly, bypassing validation.
    pub fn seed(&self, task: &Task) {
        self.store.insert(task).unwrap();
    }
}

/// Let spawned executions and waiters that are already due run to
/// completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn task_data() -> TaskData {
    TaskData {
        task_type: "webhook".into(),
        request_type: HttpMethod::Post,
        url: "http://svc.local/hook".into(),
        query_params: Default::default(),
        headers: Default::default(),
        request_body: None,
    }
}

pub fn task(id: &str, start_unix: i64, end_unix: i64, recur: u64) -> Task {
    Task {
        id: id.to_string(),
        schedule: ScheduleKind::Later,
        enable: true,
        schedule_date: String::new(),
        schedule_time: String::new(),
        recur,
        is_recur_enabled: recur > 0,
        number_of_attempts: 3,
        created_at: "2030-01-01T00:00:00.000Z".into(),
        updated_at: "2030-01-01T00:00:00.000Z".into(),
        expires_at: "2040-01-01T00:00:00.000Z".into(),
        start_unix,
        end_unix,
        task_data: task_data(),
        status: TaskStatus::default(),
    }
}

pub fn new_now_task(recur: u64) -> NewTask {
    NewTask {
        schedule: ScheduleKind::Now,
        enable: true,
        schedule_date: None,
        schedule_time: None,
        recur,
        is_recur_enabled: recur > 0,
        number_of_attempts: 0,
        expires_at: None,
        task_data: task_data(),
    }
}
