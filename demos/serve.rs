//! REST API server example
//!
//! Runs ocr-batch with the REST API, the janitor, and signal handling.
//!
//! ```text
//! OCR_BACKEND_URL=http://localhost:8000 cargo run --example serve
//! ```
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8001/swagger-ui
//! - Submit files via POST http://localhost:8001/jobs
//! - Poll progress via GET http://localhost:8001/jobs/<id>
//! - Stream events via GET http://localhost:8001/events

use ocr_batch::config::{ApiConfig, Config, ConverterConfig, ServerIntegrationConfig};
use ocr_batch::{BatchService, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut converter = ConverterConfig::default();
    if let Ok(url) = std::env::var("OCR_BACKEND_URL") {
        converter.base_url = url;
    }
    converter.api_key = std::env::var("OCR_BACKEND_API_KEY").ok();

    let config = Config {
        converter,
        server: ServerIntegrationConfig {
            api: ApiConfig {
                cors_enabled: true,
                swagger_ui: true,
                ..Default::default()
            },
        },
        ..Default::default()
    };

    let service = BatchService::new(config).await?;
    let bind_address = service.get_config().server.api.bind_address;

    service.start_janitor();
    let api = Arc::new(service.clone()).spawn_api_server();

    println!("ocr-batch listening on http://{bind_address}");
    println!("  Swagger UI:  http://{bind_address}/swagger-ui");
    println!("  Submit:      curl -F files=@scan.pdf -F files=@page.png http://{bind_address}/jobs");
    println!("  Poll:        curl http://{bind_address}/jobs/<job_id>");
    println!("  Download:    curl -OJ http://{bind_address}/jobs/<job_id>/download");
    println!("  Events:      curl -N http://{bind_address}/events");

    run_with_shutdown(service).await?;
    api.await??;

    Ok(())
}
