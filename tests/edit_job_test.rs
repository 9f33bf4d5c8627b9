//! Tests for the asynchronous edit job runner's poll state machine

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studio_gateway::backend::{EditClient, EditRequest};
use studio_gateway::config::EditConfig;
use studio_gateway::AppError;

fn edit_config(base_url: &str, max_poll_attempts: u32) -> EditConfig {
    EditConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-key".to_string()),
        poll_interval_ms: 1,
        max_poll_attempts,
        submit_timeout_ms: 2000,
        poll_timeout_ms: 2000,
        download_timeout_ms: 2000,
    }
}

fn edit_request() -> EditRequest {
    EditRequest {
        prompt: "add the jacket".to_string(),
        input_image: "aW5wdXQ=".to_string(),
        aspect_ratio: "1:1".to_string(),
        seed: None,
        safety_tolerance: 2,
        output_format: "jpeg".to_string(),
    }
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/flux-kontext-pro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-1",
            "polling_url": format!("{}/poll/job-1", server.uri()),
        })))
        .mount(server)
        .await;
}

async fn poll_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/poll/job-1")
        .count()
}

#[tokio::test]
async fn test_in_progress_then_ready_polls_exactly_n_plus_one_times() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    // Two pending polls, then ready.
    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Pending" })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": { "sample": format!("{}/sample/job-1", server.uri()) },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sample/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"edited-image".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let outcome = client.run(&edit_request()).await.unwrap();

    assert_eq!(outcome.image, b"edited-image");
    assert_eq!(outcome.job_id, "job-1");
    assert_eq!(outcome.width, 1024);
    assert_eq!(outcome.height, 1024);
    assert_eq!(poll_count(&server).await, 3);
}

#[tokio::test]
async fn test_never_ready_times_out_after_exact_attempt_budget() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Pending" })))
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 4)).unwrap();
    let err = client.run(&edit_request()).await.unwrap_err();

    assert!(matches!(err, AppError::TimedOut(_)));
    assert_eq!(poll_count(&server).await, 4);
}

#[tokio::test]
async fn test_moderated_short_circuits_after_one_poll() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "Request Moderated" })),
        )
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let err = client.run(&edit_request()).await.unwrap_err();

    assert!(matches!(err, AppError::Moderated(_)));
    assert_eq!(poll_count(&server).await, 1);
}

#[tokio::test]
async fn test_failed_status_is_generation_failed() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Error",
            "error": "NSFW content detected upstream",
        })))
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let err = client.run(&edit_request()).await.unwrap_err();

    assert!(matches!(err, AppError::GenerationFailed { ref backend, .. } if backend == "flux-kontext-pro"));
    assert_eq!(poll_count(&server).await, 1);
}

#[tokio::test]
async fn test_poll_error_status_is_a_transient_miss() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    // Two failed polls count against the budget but are retried.
    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": { "sample": format!("{}/sample/job-1", server.uri()) },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sample/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"edited-image".to_vec()))
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let outcome = client.run(&edit_request()).await.unwrap();

    assert_eq!(outcome.image, b"edited-image");
    assert_eq!(poll_count(&server).await, 3);
}

#[tokio::test]
async fn test_download_failure_is_generation_failed() {
    let server = MockServer::start().await;
    mount_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/poll/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Ready",
            "result": { "sample": format!("{}/sample/job-1", server.uri()) },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sample/job-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let err = client.run(&edit_request()).await.unwrap_err();

    assert!(matches!(err, AppError::GenerationFailed { .. }));
}

#[tokio::test]
async fn test_submit_without_job_handle_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flux-kontext-pro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "job-1" })))
        .mount(&server)
        .await;

    let client = EditClient::new(&edit_config(&server.uri(), 10)).unwrap();
    let err = client.run(&edit_request()).await.unwrap_err();

    assert!(matches!(err, AppError::GenerationFailed { .. }));
}

#[tokio::test]
async fn test_missing_credential_fails_before_any_network_call() {
    let server = MockServer::start().await;

    let mut config = edit_config(&server.uri(), 10);
    config.api_key = None;
    let client = EditClient::new(&config).unwrap();

    let err = client.run(&edit_request()).await.unwrap_err();
    assert!(matches!(err, AppError::BackendUnconfigured(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
