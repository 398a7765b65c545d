use super::*;
use crate::service::test_helpers::{ScriptedConverter, create_test_service_with, read_archive};
use crate::types::{JobId, JobStatus, JobStatusResponse, SubmitResponse};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


const BOUNDARY: &str = "ocr-batch-test-boundary";

/// Service wrapped in Arc plus a router over it
async fn create_test_app(
    converter: ScriptedConverter,
    adjust: impl FnOnce(&mut Config),
) -> (Arc<BatchService>, Router, tempfile::TempDir) {
    let (service, temp_dir) = create_test_service_with(Arc::new(converter), adjust).await;
    let service = Arc::new(service);
    let router = create_router(service.clone(), service.get_config());
    (service, router, temp_dir)
}

/// Multipart body with one part per `(name, content)` file and an optional prompt
fn multipart_body(files: &[(&str, &str)], prompt: Option<&str>) -> String {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    if let Some(prompt) = prompt {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{prompt}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn submit_request(uri: &str, files: &[(&str, &str)], prompt: Option<&str>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(files, prompt)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll the registry until the job is terminal
async fn wait_terminal(service: &BatchService, id: &JobId) -> JobStatusResponse {
    for _ in 0..500 {
        let status = service.status(id).await.unwrap();
        if status.status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[tokio::test]
async fn api_server_binds_and_stops_on_shutdown() {
    let (service, _router, _tmp) = create_test_app(ScriptedConverter::new(), |config| {
        config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    })
    .await;

    let handle = service.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_headers_are_added_when_enabled() {
    let (_service, app, _tmp) = create_test_app(ScriptedConverter::new(), |config| {
        config.server.api.cors_enabled = true;
        config.server.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_headers_are_absent_when_disabled() {
    let (_service, app, _tmp) = create_test_app(ScriptedConverter::new(), |config| {
        config.server.api.cors_enabled = false;
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn api_key_guards_job_routes() {
    let (_service, app, _tmp) = create_test_app(ScriptedConverter::new(), |config| {
        config.server.api.api_key = Some("secret".to_string());
    })
    .await;

    let response = app.clone().oneshot(get("/jobs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/jobs")
        .header("X-Api-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn uploads_over_the_body_limit_are_rejected() {
    let (service, app, _tmp) = create_test_app(ScriptedConverter::new(), |config| {
        config.server.api.max_upload_bytes = 64;
    })
    .await;

    let big = "x".repeat(1024);
    let response = app
        .oneshot(submit_request("/jobs", &[("a.png", &big)], None))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(service.list_jobs().await.is_empty());
}
