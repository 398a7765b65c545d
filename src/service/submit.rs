//! Submission gateway - validates a batch, stores its uploads and spawns the job task.

use crate::error::{Error, Result};
use crate::types::{Event, FileKind, InputFile, Job, JobId, UploadedFile};
use crate::utils::{sanitize_filename, unique_name};
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

use super::BatchService;
use super::job_task::panic_message;

/// Handle to a running job task
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    join: JoinHandle<Result<Job>>,
}

impl JobHandle {
    /// Id of the job this handle tracks
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Wait for the job to reach a terminal state and return its final snapshot
    pub async fn wait(self) -> Result<Job> {
        self.join
            .await
            .map_err(|e| Error::Other(format!("job task for {} failed: {e}", self.id)))?
    }
}

/// An accepted submission
#[derive(Debug)]
pub struct SubmittedJob {
    /// Assigned job id
    pub job_id: JobId,
    /// Number of files accepted into the job
    pub total_files: usize,
    /// Handle to the spawned job task
    pub handle: JobHandle,
}

impl BatchService {
    /// Accept a batch of files and start processing it in the background
    ///
    /// Returns as soon as the uploads are stored; the job is immediately
    /// queryable through [`status`](Self::status). Files are processed strictly
    /// in the order given. `prompt` overrides the configured default prompt when
    /// it is present and non-empty.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::Validation`] for an empty batch; no job is created
    /// - [`Error::Io`] if the uploads cannot be stored; the job is discarded
    pub async fn submit(
        &self,
        files: Vec<UploadedFile>,
        prompt: Option<String>,
    ) -> Result<SubmittedJob> {
        if !self.admission.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if files.is_empty() {
            return Err(Error::Validation("no files uploaded".into()));
        }

        let total_files = files.len();
        let id = self.registry.create(total_files).await;
        let upload_dir = self.upload_dir_for(&id);

        let inputs = match store_uploads(&upload_dir, files).await {
            Ok(inputs) => inputs,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to store uploads, discarding job");
                self.registry.remove(&id).await;
                if let Err(cleanup) = tokio::fs::remove_dir_all(&upload_dir).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(job_id = %id, error = %cleanup, "Failed to remove upload directory");
                }
                return Err(e);
            }
        };

        tracing::info!(job_id = %id, total_files, "Job accepted");
        self.emit_event(Event::JobQueued {
            id: id.clone(),
            total: total_files,
        });

        let prompt = prompt.filter(|p| !p.trim().is_empty());
        let handle = self.spawn_job(id.clone(), inputs, prompt);

        Ok(SubmittedJob {
            job_id: id,
            total_files,
            handle,
        })
    }

    /// Spawn the job task; it waits for an admission permit before processing
    fn spawn_job(&self, id: JobId, inputs: Vec<InputFile>, prompt: Option<String>) -> JobHandle {
        let service = self.clone();
        let concurrent_limit = self.admission.concurrent_limit.clone();
        let task_id = id.clone();

        let join = self.admission.tracker.spawn(async move {
            // Acquire a permit from the semaphore (waits while max_concurrent_jobs are running)
            let _permit = match concurrent_limit.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(job_id = %task_id, "Admission closed before job could start");
                    return service
                        .registry
                        .fail(&task_id, "job could not be admitted for processing")
                        .await;
                }
            };

            let outcome = AssertUnwindSafe(service.run_job(task_id.clone(), inputs, prompt))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(job)) => Ok(job),
                Ok(Err(e)) => service.abandon(&task_id, e.to_string()).await,
                Err(panic) => {
                    let reason = format!("job task panicked: {}", panic_message(panic.as_ref()));
                    service.abandon(&task_id, reason).await
                }
            }
        });

        JobHandle { id, join }
    }
}

/// Write uploads into the job's private directory
///
/// Names are sanitised and made unique within the job; submission order is kept.
async fn store_uploads(upload_dir: &Path, files: Vec<UploadedFile>) -> Result<Vec<InputFile>> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let mut taken = HashSet::new();
    let mut inputs = Vec::with_capacity(files.len());
    for (index, file) in files.into_iter().enumerate() {
        let filename = unique_name(&sanitize_filename(&file.filename, index), &mut taken);
        let path = upload_dir.join(&filename);
        tokio::fs::write(&path, &file.bytes).await?;

        inputs.push(InputFile {
            kind: FileKind::from_filename(&filename),
            filename,
            path,
        });
    }
    Ok(inputs)
}
