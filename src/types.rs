//! Core types for ocr-batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// Extensions treated as single-page images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

/// Unique, time-ordered identifier for a job
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status
///
/// Transitions only `Queued -> Processing -> {Completed | Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for an admission permit
    Queued,
    /// Inputs are being converted
    Processing,
    /// All inputs attempted and the archive is ready
    Completed,
    /// The archive could not be produced
    Failed,
}

impl JobStatus {
    /// Whether the status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch conversion request, as held by the registry
///
/// Snapshots handed out by [`JobRegistry::get`](crate::registry::JobRegistry::get)
/// are clones; mutating one has no effect on the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Number of inputs, fixed at creation
    pub total: usize,
    /// Inputs attempted so far
    pub processed: usize,
    /// Inputs that produced an output
    pub successful: usize,
    /// Inputs that failed
    pub failed: usize,
    /// File presently (or most recently) being handled
    pub current_file: String,
    /// Per-file failure descriptions, in processing order
    pub errors: Vec<String>,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the job task obtained its admission permit
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Archive location, set only once `Completed`
    pub archive_path: Option<PathBuf>,
    /// Job-level failure, set only once `Failed`
    pub fatal_error: Option<String>,
}

impl Job {
    /// Create a fresh queued job with zeroed counters
    pub fn new(id: JobId, total: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            current_file: String::new(),
            errors: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            archive_path: None,
            fatal_error: None,
        }
    }

    /// Progress percentage (0.0 to 100.0)
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.processed as f32 / self.total as f32) * 100.0
    }
}

/// Input classification by file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Multi-page document
    Pdf,
    /// Single-page image
    Image,
    /// Anything else; fails without calling the converter
    Unsupported,
}

impl FileKind {
    /// Classify a filename by its extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Self {
        let Some(ext) = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        else {
            return FileKind::Unsupported;
        };

        if ext == "pdf" {
            FileKind::Pdf
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Image
        } else {
            FileKind::Unsupported
        }
    }

    /// MIME type sent to the conversion service
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Image | FileKind::Unsupported => "image/jpeg",
        }
    }
}

/// Extension label used in diagnostics: ".xyz", or "(none)"
pub fn extension_label(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| "(none)".to_string())
}

/// One uploaded file as received from a submitter
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Original filename as supplied by the client
    pub filename: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an uploaded file
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// One stored input bound to a job
#[derive(Clone, Debug)]
pub struct InputFile {
    /// Stored filename (sanitized, unique within the job)
    pub filename: String,
    /// Location in the job's upload directory
    pub path: PathBuf,
    /// Classification by extension
    pub kind: FileKind,
}

/// Response body for a successful submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Assigned job ID
    pub job_id: JobId,
    /// Number of files accepted into the job
    pub total_files: usize,
}

/// Status view consumed by polling clients
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    /// Job ID
    pub job_id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Number of inputs
    pub total: usize,
    /// Inputs attempted so far
    pub processed: usize,
    /// Inputs converted successfully
    pub successful: usize,
    /// Inputs that failed
    pub failed: usize,
    /// Share of inputs attempted, 0.0 to 100.0
    pub percent: f32,
    /// File presently (or most recently) being handled
    pub current_file: String,
    /// Per-file failure descriptions
    pub errors: Vec<String>,
    /// Whether the archive can be downloaded
    pub archive_ready: bool,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Job-level failure (only for failed jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            total: job.total,
            processed: job.processed,
            successful: job.successful,
            failed: job.failed,
            percent: job.percent(),
            current_file: job.current_file.clone(),
            errors: job.errors.clone(),
            archive_ready: job.status == JobStatus::Completed && job.archive_path.is_some(),
            created_at: job.created_at,
            completed_at: job.completed_at,
            error: job.fatal_error.clone(),
        }
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and waiting for a worker slot
    JobQueued {
        /// Job ID
        id: JobId,
        /// Number of inputs
        total: usize,
    },

    /// Job obtained a worker slot and began processing
    JobStarted {
        /// Job ID
        id: JobId,
    },

    /// One input finished (successfully or not)
    FileProcessed {
        /// Job ID
        id: JobId,
        /// Input filename
        filename: String,
        /// Whether an output was produced
        succeeded: bool,
        /// Inputs attempted so far
        processed: usize,
        /// Number of inputs
        total: usize,
    },

    /// Job finished and its archive is ready
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Inputs converted successfully
        successful: usize,
        /// Inputs that failed
        failed: usize,
    },

    /// Job failed as a whole
    JobFailed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Job artifacts and registry entry were reclaimed
    JobReclaimed {
        /// Job ID
        id: JobId,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobQueued { .. } => "job_queued",
            Event::JobStarted { .. } => "job_started",
            Event::FileProcessed { .. } => "file_processed",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobFailed { .. } => "job_failed",
            Event::JobReclaimed { .. } => "job_reclaimed",
            Event::Shutdown => "shutdown",
        }
    }
}
