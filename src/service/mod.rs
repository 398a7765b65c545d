//! Batch job orchestration, split into focused submodules.
//!
//! The `BatchService` struct and its methods are organized by domain:
//! - [`submit`] - Submission gateway: validation, upload storage, task spawning
//! - [`job_task`] - Batch processor: drives one job to a terminal state
//! - [`services`] - Background service starters (janitor, API server)
//! - [`lifecycle`] - Shutdown coordination

mod job_task;
mod lifecycle;
mod services;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use submit::{JobHandle, SubmittedJob};

use crate::config::Config;
use crate::converter::{Converter, HttpConverter};
use crate::error::{Error, JobError, Result};
use crate::packager::ResultPackager;
use crate::registry::JobRegistry;
use crate::types::{Event, Job, JobId, JobStatus, JobStatusResponse};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Admission control and task accounting
#[derive(Clone)]
pub(crate) struct AdmissionState {
    /// Semaphore bounding concurrently processing jobs (respects max_concurrent_jobs)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Every spawned job task, so shutdown can wait for them
    pub(crate) tracker: TaskTracker,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown: CancellationToken,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BatchService {
    /// Job registry, the only shared mutable job state
    pub(crate) registry: Arc<JobRegistry>,
    /// External conversion capability (trait object for pluggable backends)
    pub(crate) converter: Arc<dyn Converter>,
    /// Archive builder for finished jobs
    pub(crate) packager: ResultPackager,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Admission control and task accounting
    pub(crate) admission: AdmissionState,
}

impl BatchService {
    /// Create a service talking to the configured HTTP conversion backend
    ///
    /// Validates the configuration and creates both artifact roots.
    pub async fn new(config: Config) -> Result<Self> {
        let converter = HttpConverter::new(&config.converter)?;
        tracing::info!(
            converter = converter.name(),
            base_url = converter.base_url(),
            "Conversion backend configured"
        );
        Self::with_converter(config, Arc::new(converter)).await
    }

    /// Create a service with a caller-supplied conversion backend
    pub async fn with_converter(config: Config, converter: Arc<dyn Converter>) -> Result<Self> {
        config.validate()?;

        for dir in [config.upload_dir(), config.results_dir()] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        // Buffer of 1000 events; slow subscribers see RecvError::Lagged
        let (event_tx, _rx) = broadcast::channel(1000);

        let admission = AdmissionState {
            concurrent_limit: Arc::new(Semaphore::new(config.processing.max_concurrent_jobs)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        };

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            converter,
            packager: ResultPackager::new(config.results_dir().clone()),
            event_tx,
            config: Arc::new(config),
            admission,
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ocr_batch::{BatchService, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let service = BatchService::new(Config::default()).await?;
    ///
    ///     let mut events = service.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Shared handle to the job registry
    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// Full snapshot of one job
    pub async fn job(&self, id: &JobId) -> Result<Job> {
        self.registry.get(id).await
    }

    /// Polling view of one job
    pub async fn status(&self, id: &JobId) -> Result<JobStatusResponse> {
        let job = self.registry.get(id).await?;
        Ok(JobStatusResponse::from(&job))
    }

    /// Polling views of every known job, newest first
    pub async fn list_jobs(&self) -> Vec<JobStatusResponse> {
        self.registry
            .list()
            .await
            .iter()
            .map(JobStatusResponse::from)
            .collect()
    }

    /// Location of a completed job's archive
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] for an unknown id
    /// - [`JobError::NotReady`] until the job is `Completed`
    /// - [`JobError::ArchiveMissing`] if the archive was removed from disk
    pub async fn archive_path(&self, id: &JobId) -> Result<PathBuf> {
        let job = self.registry.get(id).await?;

        let path = match (job.status, job.archive_path) {
            (JobStatus::Completed, Some(path)) => path,
            (status, _) => {
                return Err(JobError::NotReady {
                    id: id.clone(),
                    status,
                }
                .into());
            }
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(JobError::ArchiveMissing {
                id: id.clone(),
                path,
            }
            .into());
        }
        Ok(path)
    }

    /// Archive bytes of a completed job
    pub async fn download(&self, id: &JobId) -> Result<Vec<u8>> {
        let path = self.archive_path(id).await?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => JobError::ArchiveMissing {
                id: id.clone(),
                path,
            }
            .into(),
            _ => Error::Io(e),
        })
    }

    /// Whether the conversion backend answers its health check
    pub async fn converter_health(&self) -> Result<bool> {
        self.converter.health().await
    }

    /// Number of jobs whose task has not finished yet
    pub fn running_tasks(&self) -> usize {
        self.admission.tracker.len()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Per-job upload directory
    pub(crate) fn upload_dir_for(&self, id: &JobId) -> PathBuf {
        self.config.upload_dir().join(id.as_str())
    }

    /// Per-job result directory
    pub(crate) fn result_dir_for(&self, id: &JobId) -> PathBuf {
        self.config.results_dir().join(id.as_str())
    }
}
