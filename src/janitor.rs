//! Time-based reclamation of job artifacts
//!
//! The janitor sweeps each artifact root (uploads, results) once at start-up and
//! then on a fixed interval. Every top-level entry belongs to exactly one job:
//! per-job directories are named by job id and archives are `<job_id>.zip`.
//! A job is reclaimed only once every one of its entries, in every root, is
//! older than the retention window. Its entries are then deleted and the
//! registry entry goes with them in the same sweep.
//!
//! Entries belonging to jobs that are still queued or processing are never
//! touched, however old they are.

use crate::registry::JobRegistry;
use crate::types::{Event, JobId};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters describing one sweep
#[must_use]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Filesystem entries deleted
    pub entries_removed: usize,
    /// Filesystem entries that were due but could not be deleted
    pub entries_failed: usize,
    /// Entries left alone because their job is still running
    pub entries_skipped: usize,
    /// Registry entries removed
    pub jobs_reclaimed: usize,
}

/// Periodic artifact and registry reclamation
pub struct Janitor {
    registry: Arc<JobRegistry>,
    roots: Vec<PathBuf>,
    max_age: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl Janitor {
    /// Create a janitor over the given artifact roots
    pub fn new(
        registry: Arc<JobRegistry>,
        roots: Vec<PathBuf>,
        max_age: Duration,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            registry,
            roots,
            max_age,
            event_tx,
        }
    }

    /// Sweep immediately, then every `interval`, until `cancel` fires
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        info!(
            interval_secs = interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "janitor started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let _ = self.sweep().await;
                }
            }
        }

        info!("janitor stopped");
    }

    /// Run one sweep over every root and the registry
    pub async fn sweep(&self) -> SweepStats {
        let now = SystemTime::now();
        let cutoff = chrono::Duration::from_std(self.max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let active: HashSet<JobId> = self.registry.active_ids().await.into_iter().collect();

        let mut by_job: HashMap<JobId, Vec<Artifact>> = HashMap::new();
        for root in &self.roots {
            self.collect_root(root, now, &mut by_job).await;
        }

        let mut stats = SweepStats::default();
        for (job_id, artifacts) in by_job {
            if active.contains(&job_id) {
                stats.entries_skipped += artifacts.len();
                continue;
            }
            if !artifacts.iter().all(|artifact| artifact.expired) {
                continue;
            }

            let mut all_removed = true;
            for artifact in artifacts {
                match artifact.remove().await {
                    Ok(()) => {
                        debug!(path = %artifact.path.display(), job_id = %job_id, "removed expired artifact");
                        stats.entries_removed += 1;
                    }
                    Err(e) => {
                        warn!(path = %artifact.path.display(), error = %e, "failed to remove expired artifact");
                        stats.entries_failed += 1;
                        all_removed = false;
                    }
                }
            }

            if all_removed && self.registry.remove(&job_id).await.is_some() {
                self.reclaimed(job_id, &mut stats);
            }
        }

        if let Some(cutoff) = cutoff {
            for id in self.registry.remove_finished_before(cutoff).await {
                self.reclaimed(id, &mut stats);
            }
        }

        if stats.entries_removed > 0 || stats.entries_failed > 0 || stats.jobs_reclaimed > 0 {
            info!(
                removed = stats.entries_removed,
                failed = stats.entries_failed,
                skipped = stats.entries_skipped,
                jobs_reclaimed = stats.jobs_reclaimed,
                "janitor sweep finished"
            );
        } else {
            debug!(skipped = stats.entries_skipped, "janitor sweep found nothing to reclaim");
        }

        stats
    }

    fn reclaimed(&self, id: JobId, stats: &mut SweepStats) {
        debug!(job_id = %id, "job reclaimed");
        stats.jobs_reclaimed += 1;
        self.event_tx.send(Event::JobReclaimed { id }).ok();
    }

    /// Group the top-level entries of one root by owning job
    async fn collect_root(
        &self,
        root: &Path,
        now: SystemTime,
        by_job: &mut HashMap<JobId, Vec<Artifact>>,
    ) {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to read artifact root");
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "failed to read artifact entry");
                    break;
                }
            };

            let path = entry.path();
            let Some(job_id) = job_id_for_entry(&path) else {
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to stat artifact");
                    continue;
                }
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);

            by_job.entry(job_id).or_default().push(Artifact {
                path,
                is_dir: metadata.is_dir(),
                expired: age > self.max_age,
            });
        }
    }
}

/// One top-level entry under an artifact root
struct Artifact {
    path: PathBuf,
    is_dir: bool,
    expired: bool,
}

impl Artifact {
    async fn remove(&self) -> std::io::Result<()> {
        if self.is_dir {
            tokio::fs::remove_dir_all(&self.path).await
        } else {
            tokio::fs::remove_file(&self.path).await
        }
    }
}

/// Job id owning a top-level artifact entry
///
/// Directories are named by job id; archives are `<job_id>.zip` or, while being
/// written, `<job_id>.zip.part`.
fn job_id_for_entry(path: &Path) -> Option<JobId> {
    let name = path.file_name()?.to_str()?;
    let id = name
        .strip_suffix(".zip.part")
        .or_else(|| name.strip_suffix(".zip"))
        .unwrap_or(name);
    (!id.is_empty()).then(|| JobId::from(id))
}
