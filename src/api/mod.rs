//! Typed client for the grading-service REST API.

pub mod types;

pub use types::{latest, Assessment, Course, Score, SubmitReceipt, Submission, UserInfo};

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{DecanterError, Result, Step};
use crate::poller::ResultPoller;
use crate::transport::{ApiRequest, ApiResponse, RequestExecutor};

const SUBMISSION_FIELD: &str = "submission[file]";

/// Grading-service API over any [`RequestExecutor`].
///
/// Normally the executor is an [`InstrumentedTransport`](crate::transport::InstrumentedTransport)
/// around an [`AuthorizedExecutor`](crate::transport::AuthorizedExecutor).
#[derive(Clone)]
pub struct GraderClient {
    executor: Arc<dyn RequestExecutor>,
    base: String,
}

impl GraderClient {
    pub fn new(executor: Arc<dyn RequestExecutor>, host: &str) -> Self {
        Self {
            executor,
            base: format!("{}/api/v1", host.trim_end_matches('/')),
        }
    }

    pub fn user_url(&self) -> String {
        format!("{}/user", self.base)
    }

    pub fn courses_url(&self) -> String {
        format!("{}/courses", self.base)
    }

    pub fn assessments_url(&self, course: &str) -> String {
        format!("{}/courses/{course}/assessments", self.base)
    }

    pub fn submissions_url(&self, course: &str, assessment: &str) -> String {
        format!("{}/courses/{course}/assessments/{assessment}/submissions", self.base)
    }

    pub fn submit_url(&self, course: &str, assessment: &str) -> String {
        format!("{}/courses/{course}/assessments/{assessment}/submit", self.base)
    }

    pub async fn user_info(&self) -> Result<UserInfo> {
        self.get_json(self.user_url()).await
    }

    pub async fn courses(&self) -> Result<Vec<Course>> {
        self.get_json(self.courses_url()).await
    }

    pub async fn assessments(&self, course: &str) -> Result<Vec<Assessment>> {
        self.get_json(self.assessments_url(course)).await
    }

    pub async fn submissions(&self, course: &str, assessment: &str) -> Result<Vec<Submission>> {
        self.get_json(self.submissions_url(course, assessment)).await
    }

    /// Highest-version submission, or `None` when nothing was submitted yet.
    pub async fn latest_submission(
        &self,
        course: &str,
        assessment: &str,
    ) -> Result<Option<Submission>> {
        let submissions = self.submissions(course, assessment).await?;
        Ok(latest(&submissions).cloned())
    }

    /// Upload `path` as a new submission.
    pub async fn submit_file(
        &self,
        course: &str,
        assessment: &str,
        path: &Path,
    ) -> Result<SubmitReceipt> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DecanterError::InvalidArgument(format!("not a file: {}", path.display()))
            })?;
        let request = ApiRequest::post_file(
            self.submit_url(course, assessment),
            SUBMISSION_FIELD,
            file_name,
            contents,
        );
        let resp = self.executor.execute(request).await?;
        decode(&resp)
    }

    /// Wait until the newest submission for the assessment is graded.
    pub async fn wait_for_grade(
        &self,
        course: &str,
        assessment: &str,
        poller: ResultPoller,
    ) -> Result<Submission> {
        poller
            .poll_until_graded(|| self.submissions(course, assessment))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let resp = self.executor.execute(ApiRequest::get(url)).await?;
        decode(&resp)
    }
}

impl std::fmt::Debug for GraderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraderClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn decode<T: DeserializeOwned>(resp: &ApiResponse) -> Result<T> {
    if !resp.is_success() {
        let message = match serde_json::from_slice::<ErrorBody>(&resp.body) {
            Ok(body) => format!("unexpected status code: {}, error: {}", resp.status, body.error),
            Err(_) => format!("unexpected status code: {}", resp.status),
        };
        return Err(DecanterError::request_failed(Step::ApiRequest, message));
    }
    resp.json()
}
