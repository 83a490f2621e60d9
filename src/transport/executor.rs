use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::{ApiRequest, ApiResponse, RequestExecutor};
use crate::auth::TokenRefresher;
use crate::error::{DecanterError, Result, Step};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Unauthenticated executor backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DecanterError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: &ApiRequest, authorization: Option<&str>) -> Result<ApiResponse> {
        let mut builder = request.build(&self.client);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| DecanterError::request_failed(Step::ApiRequest, e.to_string()))?;
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp
            .bytes()
            .await
            .map_err(|e| DecanterError::request_failed(Step::ApiRequest, e.to_string()))?
            .to_vec();
        Ok(ApiResponse { status, url, body })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(&request, None).await
    }
}

/// Executor that attaches a freshly refreshed bearer token to every call.
///
/// If no token can be obtained the call fails with `TokenUnavailable` and
/// nothing is sent.
#[derive(Debug, Clone)]
pub struct AuthorizedExecutor {
    http: HttpExecutor,
    refresher: Arc<TokenRefresher>,
}

impl AuthorizedExecutor {
    pub fn new(http: HttpExecutor, refresher: Arc<TokenRefresher>) -> Self {
        Self { http, refresher }
    }
}

#[async_trait]
impl RequestExecutor for AuthorizedExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let credential = self.refresher.token().await?;
        self.http
            .send(&request, Some(&credential.authorization_header()))
            .await
    }
}
