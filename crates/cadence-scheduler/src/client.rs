use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{HttpMethod, TaskData};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

/// Per-request transport timeout. The executor's run deadline is shorter and
/// normally wins.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(180);

const USER_AGENT: &str = "cadence-scheduler";

/// What came back from one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    pub status: u16,
    /// Status line text, e.g. `503 Service Unavailable`.
    pub status_text: String,
}

impl CallResponse {
    pub fn new(status: u16, reason: Option<&str>) -> Self {
        let status_text = match reason {
            Some(reason) => format!("{status} {reason}"),
            None => status.to_string(),
        };
        Self {
            status,
            status_text,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("failed to parse URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported type for key {key}")]
    UnsupportedQueryValue { key: String },

    #[error("failed to send request: {0}")]
    Send(#[from] reqwest::Error),
}

/// Performs the HTTP call described by a task.
#[async_trait]
pub trait OutboundClient: Send + Sync {
    async fn call(&self, data: &TaskData) -> Result<CallResponse, CallError>;
}

/// [`OutboundClient`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpOutboundClient {
    http: reqwest::Client,
}

impl HttpOutboundClient {
    pub fn new() -> Result<Self, CallError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(CALL_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

fn to_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

/// Build the target URL with the task's query parameters applied on top of
/// any already present in `url`.
///
/// Only strings, numbers and booleans are accepted as parameter values.
pub fn build_url(url: &str, params: &serde_json::Map<String, Value>) -> Result<Url, CallError> {
    let mut parsed = Url::parse(url).map_err(|e| CallError::InvalidUrl(e.to_string()))?;
    if params.is_empty() {
        return Ok(parsed);
    }

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !params.contains_key(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    for (key, value) in params {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(CallError::UnsupportedQueryValue { key: key.clone() }),
        };
        pairs.push((key.clone(), rendered));
    }
    pairs.sort();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    Ok(parsed)
}

#[async_trait]
impl OutboundClient for HttpOutboundClient {
    async fn call(&self, data: &TaskData) -> Result<CallResponse, CallError> {
        let url = build_url(&data.url, &data.query_params)?;
        let mut req = self.http.request(to_method(data.request_type), url);
        for (name, value) in &data.headers {
            req = req.header(name, value);
        }
        if let Some(body) = &data.request_body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        Ok(CallResponse::new(status.as_u16(), status.canonical_reason()))
    }
}
