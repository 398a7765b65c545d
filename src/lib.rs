//! # ocr-batch
//!
//! Asynchronous batch OCR job orchestration.
//!
//! A caller submits a batch of documents and images, receives a job id at
//! once, and polls (or subscribes to events) while a background task sends
//! each file to an external conversion service. Markdown outputs are bundled
//! into one zip archive per job, and a janitor reclaims old artifacts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocr_batch::{BatchService, Config, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = BatchService::new(Config::default()).await?;
//!     service.start_janitor();
//!
//!     let submitted = service
//!         .submit(vec![UploadedFile::new("scan.png", std::fs::read("scan.png")?)], None)
//!         .await?;
//!
//!     let job = submitted.handle.wait().await?;
//!     println!("{} of {} files converted", job.successful, job.total);
//!
//!     let archive = service.download(&job.id).await?;
//!     std::fs::write("results.zip", archive)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// External conversion service boundary
pub mod converter;
/// Error types
pub mod error;
/// Retention sweeps over job artifacts
pub mod janitor;
/// Result archive construction
pub mod packager;
/// In-memory job registry
pub mod registry;
/// Job orchestration (decomposed into focused submodules)
pub mod service;
/// Core types and events
pub mod types;
/// Filename helpers
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use converter::{Converter, HttpConverter};
pub use error::{ApiError, ConversionError, Error, ErrorDetail, JobError, Result, ToHttpStatus};
pub use janitor::{Janitor, SweepStats};
pub use packager::{PackedArchive, ResultPackager};
pub use registry::JobRegistry;
pub use service::{BatchService, JobHandle, SubmittedJob};
pub use types::{
    Event, FileKind, Job, JobId, JobStatus, JobStatusResponse, SubmitResponse, UploadedFile,
};

/// Run the service until a termination signal arrives, then shut it down.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use ocr_batch::{BatchService, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = BatchService::new(Config::default()).await?;
///     service.start_janitor();
///
///     run_with_shutdown(service).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: BatchService) -> Result<()> {
    wait_for_signal().await;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
