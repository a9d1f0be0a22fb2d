//! Turning a client's [`NewTask`] into a schedulable [`Task`].

use chrono::{DateTime, Utc};

use crate::error::ValidationErrors;
use crate::time;
use crate::types::{
    NewTask, ScheduleKind, Task, TaskStatus, DEFAULT_ATTEMPTS, MAX_RECUR_SECS,
    MIN_RECUR_SECS,
};

impl NewTask {
    /// Validate the definition and derive the absolute `start_unix` /
    /// `end_unix` window relative to `now`.
    ///
    /// Every problem is collected before returning, so the client sees all
    /// failing fields at once.
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Result<Task, ValidationErrors> {
        let mut ve = ValidationErrors::new();
        let now_unix = now.timestamp();

        let schedule_date = self.schedule_date.unwrap_or_default();
        let schedule_time = self.schedule_time.unwrap_or_default();

        let start_unix = match self.schedule {
            ScheduleKind::Now => Some(now_unix),
            ScheduleKind::Later => {
                if schedule_date.is_empty() {
                    ve.add("scheduleDate", "cannot be empty");
                } else if time::parse_date(&schedule_date).is_none() {
                    ve.add("scheduleDate", "Invalid format, expected YYYY-MM-DD");
                }
                if schedule_time.is_empty() {
                    ve.add("scheduleTime", "cannot be empty");
                } else if time::parse_time(&schedule_time).is_none() {
                    ve.add("scheduleTime", "Invalid format, expected HH:MM (IST)");
                }
                time::ist_to_unix(&schedule_date, &schedule_time)
            }
        };

        let expires_at = match self.expires_at.filter(|s| !s.is_empty()) {
            Some(raw) => match time::parse_utc(&raw) {
                Some(at) => Some(at),
                None => {
                    ve.add("expiresAt", "Invalid format, expected RFC3339 (UTC)");
                    None
                }
            },
            None => Some(time::default_expiry(now)),
        };

        if self.is_recur_enabled && self.recur < MIN_RECUR_SECS {
            ve.add("recur", format!("must be at least {MIN_RECUR_SECS} seconds"));
        } else if self.is_recur_enabled && self.recur > MAX_RECUR_SECS {
            ve.add("recur", format!("must be at most {MAX_RECUR_SECS} seconds"));
        }

        let data = &self.task_data;
        if data.task_type.trim().is_empty() {
            ve.add("taskData.taskType", "cannot be empty");
        }
        if data.url.trim().is_empty() {
            ve.add("taskData.url", "cannot be empty");
        }

        if let (Some(start), Some(expiry)) = (start_unix, expires_at) {
            let end = expiry.timestamp();
            if start < now_unix {
                ve.add("scheduleDate and Time", "must be greater than current time");
            }
            if end < now_unix || start > end {
                ve.add("expiresAt", "must be greater than current time and start time");
            }
        }

        ve.into_result()?;

        // Both are Some once validation passed; the fallbacks are unreachable.
        let start_unix = start_unix.unwrap_or(now_unix);
        let expiry = expires_at.unwrap_or(now);
        let stamp = time::format_timestamp(now);

        Ok(Task {
            id,
            schedule: self.schedule,
            enable: self.enable,
            schedule_date,
            schedule_time,
            recur: if self.is_recur_enabled { self.recur } else { 0 },
            is_recur_enabled: self.is_recur_enabled,
            number_of_attempts: if self.number_of_attempts == 0 {
                DEFAULT_ATTEMPTS
            } else {
                self.number_of_attempts
            },
            created_at: stamp.clone(),
            updated_at: stamp,
            expires_at: time::format_timestamp(expiry),
            start_unix,
            end_unix: expiry.timestamp(),
            task_data: self.task_data,
            status: TaskStatus::default(),
        })
    }
}
