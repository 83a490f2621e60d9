use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use strum::AsRefStr;
use tokio::time::{Instant, MissedTickBehavior};

use super::token::{AccessCredential, TokenResponse};
use crate::error::{DecanterError, Result, Step};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);
const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Authorization-server URLs derived from the grading-service host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    pub device_init: String,
    pub device_poll: String,
    pub token: String,
    pub redirect: String,
}

impl EndpointSet {
    pub fn for_host(host: &str) -> Self {
        let base = host.trim_end_matches('/');
        Self {
            device_init: format!("{base}/oauth/device_flow_init"),
            device_poll: format!("{base}/oauth/device_flow_authorize"),
            token: format!("{base}/oauth/token"),
            redirect: format!("{base}/device_flow_auth_cb"),
        }
    }
}

/// OAuth client registration bound to one authorization server.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
    pub endpoints: EndpointSet,
}

impl ClientIdentity {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        host: &str,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            endpoints: EndpointSet::for_host(host),
        }
    }
}

/// Result of the device-flow init step.
///
/// Valid until `expires_at`; polling never continues past that instant.
#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: Option<Duration>,
    pub poll_interval: Duration,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DeviceAuthorization {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Opaque code granted once the user approves the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Capability to trade a credential's refresh token for a new credential.
#[async_trait]
pub trait TokenRefresh: Send + Sync {
    async fn refresh_token(&self, credential: &AccessCredential) -> Result<AccessCredential>;
}

#[derive(Debug, Clone, Copy, AsRefStr)]
#[strum(serialize_all = "snake_case")]
enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

#[derive(Debug, Deserialize)]
struct DeviceInitResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_url")]
    verification_uri: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    code: String,
}

/// Device Authorization Grant client for the grading service.
///
/// # Example
/// ```no_run
/// use decanter::auth::{ClientIdentity, DeviceFlowClient};
///
/// # async fn example() -> decanter::error::Result<()> {
/// let identity = ClientIdentity::new("client-id", "client-secret", "https://autolab.example.edu");
/// let client = DeviceFlowClient::new(identity);
/// let credential = client
///     .authorize(|auth| println!("Visit {} and enter {}", auth.verification_uri, auth.user_code))
///     .await?;
/// # let _ = credential;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeviceFlowClient {
    client: reqwest::Client,
    identity: ClientIdentity,
    default_poll_interval: Duration,
    authorization_timeout: Duration,
}

impl DeviceFlowClient {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            client: reqwest::Client::new(),
            identity,
            default_poll_interval: DEFAULT_POLL_INTERVAL,
            authorization_timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Upper bound on how long [`poll_for_code`](Self::poll_for_code) waits.
    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    /// Interval used when the server does not send one.
    pub fn with_default_poll_interval(mut self, interval: Duration) -> Self {
        self.default_poll_interval = interval;
        self
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Start a device flow.
    pub async fn init_device_flow(&self) -> Result<DeviceAuthorization> {
        let resp = self
            .client
            .get(&self.identity.endpoints.device_init)
            .query(&[("client_id", self.identity.client_id.as_str())])
            .send()
            .await
            .map_err(|e| DecanterError::request_failed(Step::DeviceInit, e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DecanterError::unexpected_status(
                Step::DeviceInit,
                resp.status().as_u16(),
            ));
        }
        let payload: DeviceInitResponse = resp.json().await.map_err(|e| {
            DecanterError::request_failed(Step::DeviceInit, format!("error decoding response: {e}"))
        })?;

        let expires_in = payload
            .expires_in
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let expires_at = expires_in
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);
        Ok(DeviceAuthorization {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            expires_in,
            poll_interval: payload
                .interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(self.default_poll_interval),
            expires_at,
        })
    }

    /// Poll until the user approves the device or the deadline passes.
    ///
    /// The deadline is the earlier of the authorization timeout and the
    /// authorization's own expiry. Every response other than a success with a
    /// decodable code counts as "still pending".
    pub async fn poll_for_code(
        &self,
        authorization: &DeviceAuthorization,
    ) -> Result<AuthorizationCode> {
        let mut budget = self.authorization_timeout;
        if let Some(expires_at) = authorization.expires_at {
            let remaining = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            budget = budget.min(remaining);
        }
        if budget.is_zero() {
            return Err(DecanterError::timeout(Step::DevicePoll, Duration::ZERO));
        }

        let period = if authorization.poll_interval.is_zero() {
            self.default_poll_interval
        } else {
            authorization.poll_interval
        };
        if period.is_zero() {
            return Err(DecanterError::InvalidArgument(
                "device poll interval must be non-zero".to_string(),
            ));
        }
        let started = Instant::now();
        let deadline = started + budget;
        let mut ticker = tokio::time::interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        let mut attempts: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut expired => {
                    return Err(DecanterError::timeout(Step::DevicePoll, started.elapsed()));
                }
                _ = ticker.tick() => {}
            }

            attempts += 1;
            match tokio::time::timeout_at(deadline, self.request_code(authorization)).await {
                Err(_) => {
                    return Err(DecanterError::timeout(Step::DevicePoll, started.elapsed()));
                }
                Ok(Ok(Some(code))) => {
                    tracing::debug!(attempts, "device authorized");
                    return Ok(code);
                }
                Ok(Ok(None)) => tracing::debug!(attempts, "authorization pending"),
                Ok(Err(e)) => tracing::debug!(attempts, error = %e, "device poll failed, retrying"),
            }
        }
    }

    async fn request_code(
        &self,
        authorization: &DeviceAuthorization,
    ) -> Result<Option<AuthorizationCode>> {
        let resp = self
            .client
            .get(&self.identity.endpoints.device_poll)
            .query(&[
                ("client_id", self.identity.client_id.as_str()),
                ("device_code", authorization.device_code.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DecanterError::request_failed(Step::DevicePoll, e.to_string()))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let payload: DeviceCodeResponse = resp.json().await.map_err(|e| {
            DecanterError::request_failed(Step::DevicePoll, format!("error decoding response: {e}"))
        })?;
        if payload.code.is_empty() {
            return Ok(None);
        }
        Ok(Some(AuthorizationCode(payload.code)))
    }

    /// Exchange an authorization code for a credential.
    pub async fn exchange_code(&self, code: AuthorizationCode) -> Result<AccessCredential> {
        let identity = &self.identity;
        self.token_request(
            Step::CodeExchange,
            &[
                ("grant_type", GrantType::AuthorizationCode.as_ref()),
                ("code", code.as_str()),
                ("client_id", identity.client_id.as_str()),
                ("client_secret", identity.client_secret.as_str()),
                ("redirect_uri", identity.endpoints.redirect.as_str()),
            ],
            None,
        )
        .await
    }

    /// Trade the credential's refresh token for a new credential.
    pub async fn refresh_token(&self, credential: &AccessCredential) -> Result<AccessCredential> {
        if credential.refresh_token.is_empty() {
            return Err(DecanterError::request_failed(
                Step::TokenRefresh,
                "credential has no refresh token",
            ));
        }
        let identity = &self.identity;
        self.token_request(
            Step::TokenRefresh,
            &[
                ("grant_type", GrantType::RefreshToken.as_ref()),
                ("refresh_token", credential.refresh_token.as_str()),
                ("client_id", identity.client_id.as_str()),
                ("client_secret", identity.client_secret.as_str()),
            ],
            Some(credential.refresh_token.as_str()),
        )
        .await
    }

    /// Run init, poll and exchange in order.
    ///
    /// `on_prompt` is called once with the authorization so the caller can
    /// show the verification URI and user code.
    pub async fn authorize<F>(&self, on_prompt: F) -> Result<AccessCredential>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        let authorization = self.init_device_flow().await?;
        on_prompt(&authorization);
        let code = self.poll_for_code(&authorization).await?;
        self.exchange_code(code).await
    }

    async fn token_request(
        &self,
        step: Step,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> Result<AccessCredential> {
        let resp = self
            .client
            .post(&self.identity.endpoints.token)
            .form(form)
            .send()
            .await
            .map_err(|e| DecanterError::request_failed(step, e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DecanterError::unexpected_status(step, resp.status().as_u16()));
        }
        let payload: TokenResponse = resp.json().await.map_err(|e| {
            DecanterError::request_failed(step, format!("error decoding response: {e}"))
        })?;
        payload
            .into_credential(previous_refresh, Utc::now())
            .ok_or_else(|| DecanterError::request_failed(step, "response carried no access token"))
    }
}

#[async_trait]
impl TokenRefresh for DeviceFlowClient {
    async fn refresh_token(&self, credential: &AccessCredential) -> Result<AccessCredential> {
        DeviceFlowClient::refresh_token(self, credential).await
    }
}
