#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use decanter::api::Submission;
use decanter::auth::{AccessCredential, TokenRefresh};
use decanter::error::{DecanterError, Result, Step};
use decanter::transport::{ApiRequest, ApiResponse, RequestExecutor};

pub fn credential(access_token: &str, refresh_token: &str) -> AccessCredential {
    AccessCredential {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        token_type: "Bearer".to_string(),
        expiry: None,
    }
}

/// Refresher that mints `access-N` / `refresh-N` on the N-th call.
#[derive(Default)]
pub struct CountingRefresh {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl CountingRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresh for CountingRefresh {
    async fn refresh_token(&self, _credential: &AccessCredential) -> Result<AccessCredential> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DecanterError::unexpected_status(Step::TokenRefresh, 401));
        }
        Ok(credential(&format!("access-{n}"), &format!("refresh-{n}")))
    }
}

/// Executor that counts calls and answers with a fixed status.
pub struct CountingExecutor {
    calls: AtomicUsize,
    status: u16,
    fail: bool,
    seen: Mutex<Vec<String>>,
}

impl CountingExecutor {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            status,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("executor lock poisoned").clone()
    }
}

#[async_trait]
impl RequestExecutor for CountingExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("executor lock poisoned")
            .push(request.url.clone());
        if self.fail {
            return Err(DecanterError::request_failed(
                Step::ApiRequest,
                "connection refused",
            ));
        }
        Ok(ApiResponse {
            status: self.status,
            url: request.url,
            body: br#"{"ok":true}"#.to_vec(),
        })
    }
}

pub fn submission(version: u32, scores: &[(&str, f64)]) -> Submission {
    Submission {
        version,
        filename: format!("handin-{version}.zip"),
        submitted_at: None,
        scores: scores
            .iter()
            .map(|(k, v)| (k.to_string(), decanter::api::Score::Points(*v)))
            .collect(),
    }
}
