//! Wiring of store, refresher, transport and API client from configuration.

use std::sync::Arc;

use crate::api::GraderClient;
use crate::auth::{CredentialStore, DeviceFlowClient, TokenRefresh, TokenRefresher};
use crate::config::DecanterConfig;
use crate::error::Result;
use crate::telemetry::{debug_hooks, telemetry_hooks, TelemetrySink};
use crate::transport::{AuthorizedExecutor, HookSet, HttpExecutor, InstrumentedTransport};

/// Everything a command needs to talk to the grading service.
pub struct Session {
    pub config: DecanterConfig,
    pub store: Arc<dyn CredentialStore>,
    pub device_flow: Arc<DeviceFlowClient>,
    pub grader: GraderClient,
}

impl Session {
    /// Build a session from configuration.
    ///
    /// With `debug` set, every request and failed response is also logged.
    pub fn connect(config: DecanterConfig, debug: bool) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(config.credential_store());
        let device_flow = Arc::new(config.device_flow_client()?);

        let mut hooks = HookSet::new();
        if let Some(sink) = config.telemetry_sink() {
            let sink: Arc<dyn TelemetrySink> = Arc::new(sink);
            hooks = hooks.merge(telemetry_hooks(sink));
        }
        if debug {
            hooks = hooks.merge(debug_hooks());
        }

        let grader = build_grader(
            &config.host,
            Arc::clone(&store),
            device_flow.clone(),
            hooks,
        )?;
        Ok(Self {
            config,
            store,
            device_flow,
            grader,
        })
    }
}

/// Assemble refresher → authorized executor → instrumented transport → API client.
pub fn build_grader(
    host: &str,
    store: Arc<dyn CredentialStore>,
    refresh: Arc<dyn TokenRefresh>,
    hooks: HookSet,
) -> Result<GraderClient> {
    let refresher = Arc::new(TokenRefresher::new(store, refresh));
    let authorized = AuthorizedExecutor::new(HttpExecutor::new()?, refresher);
    let transport = InstrumentedTransport::new(Arc::new(authorized), hooks);
    Ok(GraderClient::new(Arc::new(transport), host))
}
