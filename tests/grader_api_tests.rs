mod support;

use std::sync::Arc;
use std::time::Duration;

use decanter::api::{GraderClient, Score};
use decanter::auth::{CredentialStore, InMemoryCredentialStore};
use decanter::error::{DecanterError, Step};
use decanter::poller::ResultPoller;
use decanter::session::build_grader;
use decanter::transport::HookSet;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{credential, CountingRefresh};

fn grader(
    server: &MockServer,
    store: Arc<InMemoryCredentialStore>,
    refresh: Arc<CountingRefresh>,
) -> GraderClient {
    build_grader(&server.uri(), store, refresh, HookSet::new()).expect("grader client")
}

fn seeded_store() -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::with_credential(credential(
        "access-0",
        "refresh-0",
    )))
}

#[tokio::test]
async fn requests_carry_freshly_refreshed_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.edu",
            "school": "SEAS"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "cse220-s24", "display_name": "Systems", "semester": "s24"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store();
    let refresh = Arc::new(CountingRefresh::new());
    let grader = grader(&server, store.clone(), refresh.clone());

    let user = grader.user_info().await.expect("user info");
    assert_eq!(user.first_name, "Ada");
    assert_eq!(user.school.as_deref(), Some("SEAS"));

    let courses = grader.courses().await.expect("courses");
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].semester, "s24");

    assert_eq!(refresh.calls(), 2);
    assert_eq!(
        store.load().unwrap().map(|c| c.refresh_token).as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn no_request_is_sent_without_a_token() {
    let server = MockServer::start().await;
    let grader = grader(
        &server,
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(CountingRefresh::new()),
    );

    let err = grader.courses().await.unwrap_err();
    assert!(matches!(err, DecanterError::TokenUnavailable(_)));
    assert!(server.received_requests().await.expect("recorded").is_empty());
}

#[tokio::test]
async fn submit_uploads_multipart_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/courses/cse220-s24/assessments/pa1/submit"))
        .and(body_string_contains("submission[file]"))
        .and(body_string_contains("handin.zip"))
        .and(body_string_contains("zipped bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 7,
            "filename": "ada@example.edu_7_handin.zip"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("handin.zip");
    std::fs::write(&file, "zipped bytes").unwrap();

    let receipt = grader(&server, seeded_store(), Arc::new(CountingRefresh::new()))
        .submit_file("cse220-s24", "pa1", &file)
        .await
        .expect("receipt");
    assert_eq!(receipt.version, 7);
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/courses/cse220-s24/assessments/pa1/submit"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Submission limit reached"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("handin.zip");
    std::fs::write(&file, "bytes").unwrap();

    let err = grader(&server, seeded_store(), Arc::new(CountingRefresh::new()))
        .submit_file("cse220-s24", "pa1", &file)
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(Step::ApiRequest));
    assert!(err.to_string().contains("Submission limit reached"));
}

#[tokio::test]
async fn missing_file_fails_before_any_request() {
    let server = MockServer::start().await;
    let err = grader(&server, seeded_store(), Arc::new(CountingRefresh::new()))
        .submit_file("c", "a", std::path::Path::new("/definitely/not/here.zip"))
        .await
        .unwrap_err();
    assert!(matches!(err, DecanterError::Io(_)));
    assert!(server.received_requests().await.expect("recorded").is_empty());
}

#[tokio::test]
async fn wait_for_grade_polls_submissions_until_scored() {
    let server = MockServer::start().await;
    let submissions = "/api/v1/courses/cse220-s24/assessments/pa1/submissions";
    Mock::given(method("GET"))
        .and(path(submissions))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"version": 1, "filename": "a.zip", "scores": {"1": 40.0}},
            {"version": 2, "filename": "b.zip", "scores": {}}
        ])))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(submissions))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"version": 1, "filename": "a.zip", "scores": {"1": 40.0}},
            {"version": 2, "filename": "b.zip", "scores": {"1": 95.5, "2": "unreleased"}}
        ])))
        .mount(&server)
        .await;

    let graded = grader(&server, seeded_store(), Arc::new(CountingRefresh::new()))
        .wait_for_grade(
            "cse220-s24",
            "pa1",
            ResultPoller::new(Duration::from_millis(50), Duration::from_secs(5)),
        )
        .await
        .expect("graded");

    assert_eq!(graded.version, 2);
    assert_eq!(graded.scores.get("1"), Some(&Score::Points(95.5)));
    assert_eq!(
        graded.scores.get("2"),
        Some(&Score::Pending("unreleased".to_string()))
    );
}
