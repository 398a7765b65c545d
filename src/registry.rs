//! In-memory job registry
//!
//! The registry is the only shared mutable state in the service. Every job lives
//! behind its own mutex so a status poll never observes a half-applied update,
//! while the outer map lock is held only long enough to look an entry up.
//! Callers never hold either lock across I/O.

use crate::error::{JobError, Result};
use crate::types::{Job, JobId, JobStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type JobSlot = Arc<Mutex<Job>>;

/// Authoritative store of job state, keyed by job id
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobSlot>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `Queued` job with zeroed counters and return its id
    ///
    /// Ids are the UTC creation time (`YYYYMMDD_HHMMSS_ffffff`); a `-<n>` suffix is
    /// appended only if another job already holds the same timestamp.
    pub async fn create(&self, total: usize) -> JobId {
        let mut jobs = self.jobs.write().await;
        let id = next_id(&jobs, Utc::now());
        jobs.insert(id.clone(), Arc::new(Mutex::new(Job::new(id.clone(), total))));
        id
    }

    /// Snapshot of one job
    pub async fn get(&self, id: &JobId) -> Result<Job> {
        let slot = self.slot(id).await?;
        let job = slot.lock().await;
        Ok(job.clone())
    }

    /// Whether the registry knows this job
    pub async fn contains(&self, id: &JobId) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    /// Mark the job as `Processing`; a no-op if it already is
    pub async fn start(&self, id: &JobId) -> Result<Job> {
        self.update(id, |job| {
            ensure_active(job)?;
            if job.status == JobStatus::Queued {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
            }
            Ok(())
        })
        .await
    }

    /// Record which input is being handled right now
    pub async fn begin_file(&self, id: &JobId, filename: &str) -> Result<Job> {
        self.update(id, |job| {
            ensure_active(job)?;
            if job.status == JobStatus::Queued {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
            }
            job.current_file = filename.to_string();
            Ok(())
        })
        .await
    }

    /// Record the outcome of one input
    ///
    /// Increments `processed` and exactly one of `successful`/`failed` in a single
    /// critical section, appends `error_detail` on failure, and moves a `Queued`
    /// job to `Processing`.
    pub async fn record_outcome(
        &self,
        id: &JobId,
        filename: &str,
        succeeded: bool,
        error_detail: Option<String>,
    ) -> Result<Job> {
        self.update(id, |job| {
            ensure_active(job)?;
            if job.processed >= job.total {
                return Err(JobError::ProgressOverflow {
                    id: job.id.clone(),
                    total: job.total,
                }
                .into());
            }

            if job.status == JobStatus::Queued {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
            }
            job.current_file = filename.to_string();
            job.processed += 1;
            if succeeded {
                job.successful += 1;
            } else {
                job.failed += 1;
                job.errors.push(
                    error_detail.unwrap_or_else(|| format!("{filename}: conversion failed")),
                );
            }
            Ok(())
        })
        .await
    }

    /// Move the job to `Completed` with its archive location
    pub async fn complete(&self, id: &JobId, archive_path: PathBuf) -> Result<Job> {
        self.update(id, |job| {
            ensure_active(job)?;
            job.status = JobStatus::Completed;
            job.archive_path = Some(archive_path);
            job.completed_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// Move the job to `Failed` with a job-level error
    pub async fn fail(&self, id: &JobId, fatal_error: impl Into<String>) -> Result<Job> {
        let fatal_error = fatal_error.into();
        self.update(id, |job| {
            ensure_active(job)?;
            job.status = JobStatus::Failed;
            job.fatal_error = Some(fatal_error);
            job.archive_path = None;
            job.completed_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// Delete an entry, returning its last state
    pub async fn remove(&self, id: &JobId) -> Option<Job> {
        let slot = self.jobs.write().await.remove(id)?;
        let job = slot.lock().await;
        Some(job.clone())
    }

    /// Snapshots of every job, newest first
    pub async fn list(&self) -> Vec<Job> {
        let slots: Vec<JobSlot> = self.jobs.read().await.values().cloned().collect();

        let mut jobs = Vec::with_capacity(slots.len());
        for slot in slots {
            jobs.push(slot.lock().await.clone());
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs
    }

    /// Number of jobs currently held
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Ids of jobs that have not reached a terminal state
    pub async fn active_ids(&self) -> Vec<JobId> {
        self.list()
            .await
            .into_iter()
            .filter(|job| !job.status.is_terminal())
            .map(|job| job.id)
            .collect()
    }

    /// Remove terminal jobs that finished before `cutoff`
    pub async fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let mut expired = Vec::new();
        for job in self.list().await {
            if job.status.is_terminal()
                && job.completed_at.is_some_and(|at| at < cutoff)
                && self.remove(&job.id).await.is_some()
            {
                expired.push(job.id);
            }
        }
        expired
    }

    async fn slot(&self, id: &JobId) -> Result<JobSlot> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound { id: id.clone() }.into())
    }

    async fn update<F>(&self, id: &JobId, apply: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let slot = self.slot(id).await?;
        let mut job = slot.lock().await;
        apply(&mut job)?;
        Ok(job.clone())
    }
}

fn ensure_active(job: &Job) -> Result<()> {
    if job.status.is_terminal() {
        return Err(JobError::AlreadyTerminal {
            id: job.id.clone(),
            status: job.status,
        }
        .into());
    }
    Ok(())
}

fn next_id(jobs: &HashMap<JobId, JobSlot>, now: DateTime<Utc>) -> JobId {
    let base = now.format("%Y%m%d_%H%M%S_%6f").to_string();
    let mut id = JobId(base.clone());
    let mut n = 1;
    while jobs.contains_key(&id) {
        id = JobId(format!("{base}-{n}"));
        n += 1;
    }
    id
}
