//! Batch processor - drives one job from its admission permit to a terminal state.
//!
//! Inputs are handled strictly in submission order, one at a time. A failing
//! input only fails itself: the error is recorded on the job and the loop moves
//! on. Packaging is the only step whose failure fails the whole job.

use crate::converter::render_document;
use crate::error::{ConversionError, Error, JobError, Result};
use crate::types::{Event, FileKind, InputFile, Job, JobId, extension_label};
use crate::utils::{output_name, unique_name};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use super::BatchService;

impl BatchService {
    /// Process every input of a job, then package and finalize it
    ///
    /// Returns the job's terminal snapshot. An `Err` here means the registry
    /// rejected an update, which only happens if the job was removed or
    /// finalized by someone else.
    pub(crate) async fn run_job(
        &self,
        id: JobId,
        inputs: Vec<InputFile>,
        prompt: Option<String>,
    ) -> Result<Job> {
        let job = self.registry.start(&id).await?;
        tracing::info!(job_id = %id, total = job.total, "Job started");
        self.emit_event(Event::JobStarted { id: id.clone() });

        let result_dir = self.result_dir_for(&id);
        if let Err(e) = tokio::fs::create_dir_all(&result_dir).await {
            tracing::warn!(job_id = %id, error = %e, "Failed to create result directory");
        }

        let prompt = prompt.unwrap_or_else(|| self.config.processing.default_prompt.clone());
        let mut taken = HashSet::new();

        for input in &inputs {
            self.registry.begin_file(&id, &input.filename).await?;

            let (succeeded, detail) = match self
                .process_file(input, &prompt, &result_dir, &mut taken)
                .await
            {
                Ok(output) => {
                    tracing::debug!(
                        job_id = %id,
                        file = %input.filename,
                        output = %output.display(),
                        "File converted"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(job_id = %id, file = %input.filename, error = %e, "File failed");
                    (false, Some(file_error_detail(&input.filename, &e)))
                }
            };

            let job = self
                .registry
                .record_outcome(&id, &input.filename, succeeded, detail)
                .await?;

            self.emit_event(Event::FileProcessed {
                id: id.clone(),
                filename: input.filename.clone(),
                succeeded,
                processed: job.processed,
                total: job.total,
            });
        }

        self.finalize(&id, &result_dir).await
    }

    /// Package outputs and move the job to its terminal state
    async fn finalize(&self, id: &JobId, result_dir: &Path) -> Result<Job> {
        match self.packager.pack(id, result_dir).await {
            Ok(packed) => {
                let job = self.registry.complete(id, packed.path).await?;
                tracing::info!(
                    job_id = %id,
                    successful = job.successful,
                    failed = job.failed,
                    entries = packed.entries.len(),
                    "Job completed"
                );
                self.emit_event(Event::JobCompleted {
                    id: id.clone(),
                    successful: job.successful,
                    failed: job.failed,
                });
                Ok(job)
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Job failed during packaging");
                let job = self.registry.fail(id, e.to_string()).await?;
                self.emit_event(Event::JobFailed {
                    id: id.clone(),
                    error: e.to_string(),
                });
                Ok(job)
            }
        }
    }

    /// Fail a job whose task stopped before reaching a terminal state
    ///
    /// A job that is already terminal keeps its state and its snapshot is
    /// returned unchanged.
    pub(crate) async fn abandon(&self, id: &JobId, reason: String) -> Result<Job> {
        tracing::error!(job_id = %id, error = %reason, "Job task stopped early");
        match self.registry.fail(id, reason.clone()).await {
            Ok(job) => {
                self.emit_event(Event::JobFailed {
                    id: id.clone(),
                    error: reason,
                });
                Ok(job)
            }
            Err(Error::Job(JobError::AlreadyTerminal { .. })) => self.registry.get(id).await,
            Err(e) => Err(e),
        }
    }

    /// Convert one input and write its output; returns the output path
    async fn process_file(
        &self,
        input: &InputFile,
        prompt: &str,
        result_dir: &Path,
        taken: &mut HashSet<String>,
    ) -> Result<PathBuf> {
        let text = match input.kind {
            FileKind::Unsupported => {
                return Err(ConversionError::UnsupportedType {
                    extension: extension_label(&input.filename),
                }
                .into());
            }
            FileKind::Pdf => {
                let bytes = tokio::fs::read(&input.path).await?;
                let pages = self
                    .with_timeout(self.converter.convert_document(&input.filename, bytes, prompt))
                    .await?;
                render_document(&pages)
            }
            FileKind::Image => {
                let bytes = tokio::fs::read(&input.path).await?;
                self.with_timeout(self.converter.convert_image(&input.filename, bytes, prompt))
                    .await?
            }
        };

        let output = result_dir.join(unique_name(&output_name(&input.filename), taken));
        tokio::fs::write(&output, text).await?;
        Ok(output)
    }

    /// Bound one converter call by the configured per-call timeout
    ///
    /// A panic inside the converter is caught and reported as a failure of
    /// this call only.
    async fn with_timeout<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let after = self.config.processing.conversion_timeout;
        match tokio::time::timeout(after, AssertUnwindSafe(call).catch_unwind()).await {
            Err(_) => Err(ConversionError::Timeout { after }.into()),
            Ok(Err(panic)) => Err(ConversionError::Panicked(panic_message(panic.as_ref())).into()),
            Ok(Ok(result)) => result,
        }
    }
}

/// Text carried by a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Per-file diagnostic: `<filename>: <error>`
pub(crate) fn file_error_detail(filename: &str, error: &Error) -> String {
    match error {
        Error::Conversion(inner) => format!("{filename}: {inner}"),
        other => format!("{filename}: {other}"),
    }
}
