use std::sync::Arc;
use std::time::Duration;

use cadence_core::Task;
use cadence_store::TaskStore;
use rand::Rng;
use tracing::{error, info, warn};

use crate::alert::AlertSender;
use crate::client::OutboundClient;

/// Timing knobs of a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wall-clock budget for the whole attempt loop, backoff included.
    pub deadline: Duration,
    /// Backoff after attempt `n` is `n * base_delay` plus jitter.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(120),
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt + jitter(self.max_jitter)
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, message: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }
}

/// Runs one task's outbound call to completion.
///
/// Works on a snapshot of the task taken when the run was spawned; the
/// store is only written to, never re-read.
pub struct TaskExecutor {
    task: Task,
    store: Arc<dyn TaskStore>,
    client: Arc<dyn OutboundClient>,
    alerts: Arc<dyn AlertSender>,
    policy: RetryPolicy,
}

impl TaskExecutor {
    pub fn new(
        task: Task,
        store: Arc<dyn TaskStore>,
        client: Arc<dyn OutboundClient>,
        alerts: Arc<dyn AlertSender>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            task,
            store,
            client,
            alerts,
            policy,
        }
    }

    /// Attempt the call until it succeeds, the budget runs out, or the
    /// deadline passes. The outcome is written to the store exactly once;
    /// failures also raise exactly one alert.
    pub async fn run(self) -> ExecutionOutcome {
        let mut attempts = 0u32;
        let result = tokio::time::timeout(self.policy.deadline, self.attempt_loop(&mut attempts)).await;
        let outcome = match result {
            Ok(Ok(())) => ExecutionOutcome::Succeeded { attempts },
            Ok(Err(message)) => ExecutionOutcome::Failed { attempts, message },
            Err(_) => ExecutionOutcome::Failed {
                attempts,
                message: format!(
                    "execution deadline of {}s exceeded",
                    self.policy.deadline.as_secs()
                ),
            },
        };

        match &outcome {
            ExecutionOutcome::Succeeded { .. } => self.record_status("", true),
            ExecutionOutcome::Failed { message, .. } => {
                error!(task_id = %self.task.id, attempts, err = %message, "task failed, attempts exhausted");
                self.record_status(message, false);
                if let Err(e) = self.alerts.send_alert(&self.task, message).await {
                    error!(task_id = %self.task.id, "failed to send alert: {e}");
                }
            }
        }
        outcome
    }

    /// Returns the exception message of the final attempt on failure.
    async fn attempt_loop(&self, attempts: &mut u32) -> Result<(), String> {
        let budget = self.task.attempts();
        let data = &self.task.task_data;

        for attempt in 1..=budget {
            *attempts = attempt;
            let message = match self.client.call(data).await {
                Ok(resp) if resp.is_success() => {
                    info!(task_id = %self.task.id, status = resp.status, attempt, "task executed successfully");
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(task_id = %self.task.id, url = %data.url, attempt, status = %resp.status_text, "task call returned non-success status");
                    resp.status_text
                }
                Err(e) => {
                    warn!(task_id = %self.task.id, url = %data.url, attempt, err = %e, "task call failed");
                    e.to_string()
                }
            };

            if attempt == budget {
                return Err(message);
            }
            tokio::time::sleep(self.policy.backoff(attempt)).await;
        }
        Err(String::new())
    }

    fn record_status(&self, exception_message: &str, is_complete: bool) {
        if let Err(e) = self
            .store
            .update_task_status(&self.task.id, exception_message, is_complete)
        {
            error!(task_id = %self.task.id, "failed to update task status: {e}");
        }
    }
}
