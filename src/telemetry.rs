//! Fire-and-forget request telemetry, delivered through transport hooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DecanterError, Result};
use crate::transport::{CallOutcome, HookSet, RequestSnapshot};

/// Row recorded for every outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    pub request_id: Uuid,
    pub url: String,
    pub size: usize,
}

/// Row recorded for failed calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRecord {
    pub request_id: Uuid,
    pub url: String,
    /// Status line text, e.g. `503 Service Unavailable`.
    pub status: Option<String>,
    pub code: Option<u16>,
    pub error: Option<String>,
}

impl From<&RequestSnapshot> for RequestRecord {
    fn from(snapshot: &RequestSnapshot) -> Self {
        Self {
            request_id: snapshot.id,
            url: snapshot.path.clone(),
            size: snapshot.size,
        }
    }
}

impl From<&CallOutcome> for ResponseRecord {
    fn from(outcome: &CallOutcome) -> Self {
        Self {
            request_id: outcome.request.id,
            url: outcome.request.path.clone(),
            status: outcome.response.as_ref().map(|r| status_text(r.status)),
            code: outcome.response.as_ref().map(|r| r.status),
            error: outcome.error.clone(),
        }
    }
}

fn status_text(code: u16) -> String {
    match reqwest::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("{code} {reason}"),
        None => code.to_string(),
    }
}

/// Destination for telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record_request(&self, record: RequestRecord) -> Result<()>;
    async fn record_response(&self, record: ResponseRecord) -> Result<()>;
}

/// Sink that inserts rows into a REST collector (`<url>/requests`,
/// `<url>/errors`) without asking for the rows back.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTelemetrySink {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let mut builder = self
            .client
            .post(format!("{}/{table}", self.base_url))
            .header("Prefer", "return=minimal")
            .json(row);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| DecanterError::Hook(format!("telemetry delivery failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(DecanterError::Hook(format!(
                "telemetry collector returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn record_request(&self, record: RequestRecord) -> Result<()> {
        self.insert("requests", &record).await
    }

    async fn record_response(&self, record: ResponseRecord) -> Result<()> {
        self.insert("errors", &record).await
    }
}

/// Hooks that forward every request, and every failed call, to `sink`.
pub fn telemetry_hooks(sink: Arc<dyn TelemetrySink>) -> HookSet {
    let request_sink = Arc::clone(&sink);
    HookSet::new()
        .on_before(move |request: RequestSnapshot| {
            let sink = Arc::clone(&request_sink);
            async move { sink.record_request(RequestRecord::from(&request)).await }
        })
        .on_after(move |outcome: CallOutcome| {
            let sink = Arc::clone(&sink);
            async move {
                if !outcome.is_failure() {
                    return Ok(());
                }
                sink.record_response(ResponseRecord::from(&outcome)).await
            }
        })
}

/// Hooks that log each request and each failed call through `tracing`.
pub fn debug_hooks() -> HookSet {
    HookSet::new()
        .on_before(|request: RequestSnapshot| async move {
            tracing::debug!(
                request_id = %request.id,
                method = %request.method,
                url = %request.url,
                size = request.size,
                "request"
            );
            Ok::<(), DecanterError>(())
        })
        .on_after(|outcome: CallOutcome| async move {
            if outcome.is_failure() {
                tracing::debug!(
                    request_id = %outcome.request.id,
                    url = %outcome.request.url,
                    status = ?outcome.response.as_ref().map(|r| r.status),
                    error = ?outcome.error,
                    "error in response"
                );
            }
            Ok::<(), DecanterError>(())
        })
}
