use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::{JoinError, JoinHandle};

use super::hooks::{CallOutcome, HookSet, RequestSnapshot};
use super::{ApiRequest, ApiResponse, RequestExecutor};
use crate::error::Result;

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Wraps an executor and fans out observer hooks around every call.
///
/// Before-hooks are spawned and the inner call starts without waiting for
/// them. After-hooks are spawned once the inner call returns. The transport
/// then waits for all hook tasks, at most for the grace period, and returns
/// the inner result untouched. Hook errors, panics and stragglers are logged
/// and otherwise ignored.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use decanter::transport::{HookSet, HttpExecutor, InstrumentedTransport, RequestSnapshot};
///
/// # fn example() -> decanter::error::Result<()> {
/// let hooks = HookSet::new().on_before(|req: RequestSnapshot| async move {
///     tracing::info!(path = %req.path, "outgoing");
///     Ok::<(), decanter::error::DecanterError>(())
/// });
/// let transport = InstrumentedTransport::new(Arc::new(HttpExecutor::new()?), hooks);
/// # let _ = transport;
/// # Ok(())
/// # }
/// ```
pub struct InstrumentedTransport {
    inner: Arc<dyn RequestExecutor>,
    hooks: HookSet,
    grace_period: Duration,
}

impl InstrumentedTransport {
    pub fn new(inner: Arc<dyn RequestExecutor>, hooks: HookSet) -> Self {
        Self {
            inner,
            hooks,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    async fn settle(&self, mut pending: FuturesUnordered<JoinHandle<Result<()>>>) {
        if pending.is_empty() {
            return;
        }
        let grace = tokio::time::sleep(self.grace_period);
        tokio::pin!(grace);
        loop {
            tokio::select! {
                biased;
                joined = pending.next() => match joined {
                    Some(result) => log_hook_result(result),
                    None => return,
                },
                _ = &mut grace => {
                    // Dropping the handles detaches the stragglers.
                    tracing::warn!(
                        unfinished = pending.len(),
                        grace_ms = self.grace_period.as_millis() as u64,
                        "timed out waiting for request hooks"
                    );
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl RequestExecutor for InstrumentedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let snapshot = RequestSnapshot::of(&request);
        let pending = FuturesUnordered::new();

        for hook in &self.hooks.before {
            let hook = Arc::clone(hook);
            let snapshot = snapshot.clone();
            pending.push(tokio::spawn(async move { hook.before(snapshot).await }));
        }

        let result = self.inner.execute(request).await;

        let outcome = CallOutcome::of(snapshot, &result);
        for hook in &self.hooks.after {
            let hook = Arc::clone(hook);
            let outcome = outcome.clone();
            pending.push(tokio::spawn(async move { hook.after(outcome).await }));
        }

        self.settle(pending).await;
        result
    }
}

fn log_hook_result(result: std::result::Result<Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "request hook failed"),
        Err(e) => tracing::warn!(error = %e, "request hook panicked"),
    }
}

impl std::fmt::Debug for InstrumentedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedTransport")
            .field("hooks", &self.hooks)
            .field("grace_period", &self.grace_period)
            .finish()
    }
}
