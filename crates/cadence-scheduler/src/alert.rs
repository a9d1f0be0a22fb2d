use std::time::Duration;

use async_trait::async_trait;
use cadence_core::config::CadenceConfig;
use cadence_core::Task;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const ALERT_TIMEOUT: Duration = Duration::from_secs(5);
const ALERT_TITLE: &str = "Exception In Scheduler Service";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("alert webhook rejected the message with status {status}")]
    Rejected { status: u16 },
}

/// Notified when a task exhausts its attempt budget.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send_alert(&self, task: &Task, error_text: &str) -> Result<(), AlertError>;
}

/// Discards every alert. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertSender;

#[async_trait]
impl AlertSender for NoopAlertSender {
    async fn send_alert(&self, task: &Task, _error_text: &str) -> Result<(), AlertError> {
        debug!(task_id = %task.id, "alert suppressed");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Text {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct Block {
    #[serde(rename = "type")]
    kind: &'static str,
    text: Text,
}

#[derive(Debug, Serialize)]
struct Payload {
    blocks: Vec<Block>,
}

fn payload(task_id: &str, error_text: &str) -> Payload {
    Payload {
        blocks: vec![
            Block {
                kind: "header",
                text: Text {
                    kind: "plain_text",
                    text: ALERT_TITLE.to_string(),
                },
            },
            Block {
                kind: "section",
                text: Text {
                    kind: "mrkdwn",
                    text: format!("```TaskID: {task_id}\nError: {error_text}\n```"),
                },
            },
        ],
    }
}

/// Posts failure alerts to a Slack incoming webhook.
///
/// Alerts go out in production mode, or in dev mode when
/// `slack.send_alerts_in_dev` is set. Otherwise `send_alert` is a no-op.
pub struct SlackAlertSender {
    http: reqwest::Client,
    webhook_url: String,
    enabled: bool,
}

impl SlackAlertSender {
    pub fn new(webhook_url: impl Into<String>, enabled: bool) -> Result<Self, AlertError> {
        let http = reqwest::Client::builder().timeout(ALERT_TIMEOUT).build()?;
        Ok(Self {
            http,
            webhook_url: webhook_url.into(),
            enabled,
        })
    }

    pub fn from_config(config: &CadenceConfig) -> Result<Self, AlertError> {
        Self::new(config.slack.webhook_url.clone(), config.alerts_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl AlertSender for SlackAlertSender {
    async fn send_alert(&self, task: &Task, error_text: &str) -> Result<(), AlertError> {
        if !self.enabled {
            debug!(task_id = %task.id, "alerts disabled outside production");
            return Ok(());
        }
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload(&task.id, error_text))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AlertError::Rejected {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}
