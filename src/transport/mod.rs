//! Request transport: executors, observer hooks and the instrumented wrapper.

pub mod executor;
pub mod hooks;
pub mod instrumented;

pub use executor::{AuthorizedExecutor, HttpExecutor};
pub use hooks::{AfterHook, BeforeHook, CallOutcome, HookSet, RequestSnapshot, ResponseSnapshot};
pub use instrumented::InstrumentedTransport;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{DecanterError, Result, Step};

/// Anything that can carry an [`ApiRequest`] to the server.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Send the request. Non-success statuses are returned as responses;
    /// only transport-level failures are errors.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Request body variants used by the grading-service API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    File {
        field: String,
        file_name: String,
        contents: Vec<u8>,
    },
}

impl RequestBody {
    fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Form(pairs) => pairs.iter().map(|(k, v)| k.len() + v.len() + 2).sum(),
            Self::File {
                field,
                file_name,
                contents,
            } => field.len() + file_name.len() + contents.len(),
        }
    }
}

/// An outgoing API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub id: Uuid,
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            body,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestBody::Empty)
    }

    pub fn post_file(
        url: impl Into<String>,
        field: impl Into<String>,
        file_name: impl Into<String>,
        contents: Vec<u8>,
    ) -> Self {
        Self::new(
            Method::POST,
            url,
            RequestBody::File {
                field: field.into(),
                file_name: file_name.into(),
                contents,
            },
        )
    }

    /// URL path, or the raw URL if it does not parse.
    pub fn path(&self) -> String {
        reqwest::Url::parse(&self.url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| self.url.clone())
    }

    /// Rough wire size: request line plus body.
    pub fn approximate_size(&self) -> usize {
        self.method.as_str().len() + 1 + self.url.len() + self.body.len()
    }

    pub(crate) fn build(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::File {
                field,
                file_name,
                contents,
            } => {
                let part =
                    reqwest::multipart::Part::bytes(contents.clone()).file_name(file_name.clone());
                builder.multipart(reqwest::multipart::Form::new().part(field.clone(), part))
            }
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            DecanterError::request_failed(Step::ApiRequest, format!("error decoding response: {e}"))
        })
    }
}
