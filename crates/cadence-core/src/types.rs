use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Minimum period of a recurring task, in seconds.
pub const MIN_RECUR_SECS: u64 = 3600;
/// Maximum period of a recurring task: one hundred years, in seconds.
pub const MAX_RECUR_SECS: u64 = 100 * 36_525 * 864;
/// Attempt budget applied when a client sends `0` or nothing.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// HTTP verb used for a task's outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
    Put,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Put => "PUT",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a task should first run.
///
/// Accepted case-insensitively on input (`"now"`, `"Later"`), always
/// serialised upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleKind {
    /// Run as soon as the task is inserted.
    #[default]
    Now,
    /// Run at `scheduleDate` + `scheduleTime` (IST).
    Later,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::Now => "NOW",
            ScheduleKind::Later => "LATER",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NOW" => Ok(ScheduleKind::Now),
            "LATER" => Ok(ScheduleKind::Later),
            other => Err(format!("unknown schedule kind: {other}")),
        }
    }
}

impl Serialize for ScheduleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScheduleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The outbound call a task performs when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    /// Free-form label chosen by the client (e.g. `"webhook"`).
    pub task_type: String,
    pub request_type: HttpMethod,
    pub url: String,
    /// Values must be strings, numbers or booleans.
    #[serde(default)]
    pub query_params: Map<String, Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Sent as a JSON body when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
}

/// Outcome of the most recent execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// UTC timestamp of the last finished run. `None` until the first run ends.
    #[serde(default)]
    pub last_executed_at: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub exception_message: String,
}

impl TaskStatus {
    /// True once the task has been attempted at least once, whatever the outcome.
    pub fn is_already_executed(&self) -> bool {
        self.last_executed_at
            .as_deref()
            .is_some_and(|ts| !ts.is_empty())
    }
}

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// UUID v4 string, primary key.
    #[serde(rename = "_id")]
    pub id: String,
    pub schedule: ScheduleKind,
    pub enable: bool,
    /// IST date the task was scheduled for (`YYYY-MM-DD`), empty for `NOW`.
    #[serde(default)]
    pub schedule_date: String,
    /// IST time of day the task was scheduled for (`HH:MM`), empty for `NOW`.
    #[serde(default)]
    pub schedule_time: String,
    /// Period in seconds; 0 unless `is_recur_enabled`.
    pub recur: u64,
    pub is_recur_enabled: bool,
    pub number_of_attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
    /// First run, UTC unix seconds.
    pub start_unix: i64,
    /// Expiry, UTC unix seconds. Always `>= start_unix`.
    pub end_unix: i64,
    pub task_data: TaskData,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.is_recur_enabled && self.recur > 0
    }

    /// A one-shot task that already ran is inert: it is never rescheduled,
    /// toggled back on, or executed manually.
    pub fn is_finished_one_shot(&self) -> bool {
        self.status.is_already_executed() && !self.is_recur_enabled
    }

    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.end_unix < now_unix
    }

    /// Attempt budget with the `0 means default` rule applied.
    pub fn attempts(&self) -> u32 {
        if self.number_of_attempts == 0 {
            DEFAULT_ATTEMPTS
        } else {
            self.number_of_attempts
        }
    }
}

fn bool_true() -> bool {
    true
}

/// Client-supplied definition of a new task, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub schedule: ScheduleKind,
    #[serde(default = "bool_true")]
    pub enable: bool,
    #[serde(default)]
    pub schedule_date: Option<String>,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub recur: u64,
    #[serde(default)]
    pub is_recur_enabled: bool,
    #[serde(default)]
    pub number_of_attempts: u32,
    /// UTC expiry; ten years out when omitted.
    #[serde(default)]
    pub expires_at: Option<String>,
    pub task_data: TaskData,
}
