//! Observer hooks run around every request.
//!
//! Hooks only ever see owned snapshots, so they cannot touch the request in
//! flight or the response handed back to the caller.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{ApiRequest, ApiResponse};
use crate::error::Result;

/// Copy of a request as seen by hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub id: Uuid,
    pub method: String,
    pub url: String,
    pub path: String,
    pub size: usize,
}

impl RequestSnapshot {
    pub fn of(request: &ApiRequest) -> Self {
        Self {
            id: request.id,
            method: request.method.to_string(),
            url: request.url.clone(),
            path: request.path(),
            size: request.approximate_size(),
        }
    }
}

/// Copy of a response as seen by hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub body_len: usize,
}

/// What an after-hook observes: the request and whichever of response or
/// error the call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub request: RequestSnapshot,
    pub response: Option<ResponseSnapshot>,
    pub error: Option<String>,
}

impl CallOutcome {
    pub fn of(request: RequestSnapshot, result: &Result<ApiResponse>) -> Self {
        match result {
            Ok(resp) => Self {
                request,
                response: Some(ResponseSnapshot {
                    status: resp.status,
                    body_len: resp.body.len(),
                }),
                error: None,
            },
            Err(err) => Self {
                request,
                response: None,
                error: Some(err.to_string()),
            },
        }
    }

    /// True for transport errors and non-2xx statuses.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
            || self
                .response
                .as_ref()
                .is_some_and(|r| !(200..300).contains(&r.status))
    }
}

/// Runs before the request is sent.
#[async_trait]
pub trait BeforeHook: Send + Sync {
    async fn before(&self, request: RequestSnapshot) -> Result<()>;
}

/// Runs after the inner executor returns.
#[async_trait]
pub trait AfterHook: Send + Sync {
    async fn after(&self, outcome: CallOutcome) -> Result<()>;
}

#[async_trait]
impl<F, Fut> BeforeHook for F
where
    F: Fn(RequestSnapshot) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn before(&self, request: RequestSnapshot) -> Result<()> {
        (self)(request).await
    }
}

#[async_trait]
impl<F, Fut> AfterHook for F
where
    F: Fn(CallOutcome) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn after(&self, outcome: CallOutcome) -> Result<()> {
        (self)(outcome).await
    }
}

/// Ordered before/after hooks registered on a transport.
#[derive(Clone, Default)]
pub struct HookSet {
    pub(crate) before: Vec<Arc<dyn BeforeHook>>,
    pub(crate) after: Vec<Arc<dyn AfterHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before(mut self, hook: impl BeforeHook + 'static) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    pub fn on_after(mut self, hook: impl AfterHook + 'static) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Append every hook of `other`, keeping order.
    pub fn merge(mut self, other: HookSet) -> Self {
        self.before.extend(other.before);
        self.after.extend(other.after);
        self
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
