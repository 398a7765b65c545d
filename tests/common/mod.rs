//! Shared fixtures for integration tests

#![allow(dead_code)]

use ocr_batch::config::Config;
use ocr_batch::{BatchService, UploadedFile};
use serde_json::json;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock OCR backend answering every image with `text of image` and every
/// document with two pages
pub async fn mock_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ocr/image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "text of image"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ocr/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"result": "first page"}, {"result": "second page"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    server
}

/// Configuration pointing at `backend` with artifacts under `root`
pub fn config_for(backend: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.upload_dir = root.join("uploads");
    config.storage.results_dir = root.join("results");
    config.converter.base_url = backend.uri();
    config
}

/// Service backed by the HTTP converter, plus the tempdir keeping its roots alive
pub async fn service_for(backend: &MockServer) -> (BatchService, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let service = BatchService::new(config_for(backend, temp_dir.path()))
        .await
        .unwrap();
    (service, temp_dir)
}

pub fn upload(name: &str) -> UploadedFile {
    UploadedFile::new(name, format!("bytes of {name}").into_bytes())
}

/// Entry names and contents of a zip archive, in archive order
pub fn archive_entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}
