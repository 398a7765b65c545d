//! Error types for ocr-batch
//!
//! This module provides the error taxonomy for the library:
//! - Job lifecycle errors (unknown job, not ready, illegal transitions)
//! - Per-file conversion errors, which never escape a single input
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for ocr-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ocr-batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "processing.max_concurrent_jobs")
        key: Option<String>,
    },

    /// Malformed submission, reported before any job is created
    #[error("validation error: {0}")]
    Validation(String),

    /// Job lifecycle error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// A single input could not be converted
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Building the result archive failed; fatal to the whole job
    #[error("packaging failed for job {job_id}: {reason}")]
    Packaging {
        /// The job whose archive could not be built
        job_id: JobId,
        /// The reason packaging failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error talking to the conversion service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ZIP archive error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Job lifecycle errors
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this id is known to the registry
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// Download requested before the job completed
    #[error("job {id} is not ready (status: {status})")]
    NotReady {
        /// The job ID
        id: JobId,
        /// The job's current status
        status: JobStatus,
    },

    /// A terminal job was asked to change state again
    #[error("job {id} is already {status}")]
    AlreadyTerminal {
        /// The job ID
        id: JobId,
        /// The terminal status the job is in
        status: JobStatus,
    },

    /// More outcomes were recorded than the job has inputs
    #[error("job {id} already recorded all {total} outcomes")]
    ProgressOverflow {
        /// The job ID
        id: JobId,
        /// Number of inputs the job was created with
        total: usize,
    },

    /// The job completed but its archive is gone from disk
    #[error("archive for job {id} not found at {path}")]
    ArchiveMissing {
        /// The job ID
        id: JobId,
        /// Where the archive was expected
        path: PathBuf,
    },
}

/// Errors for one input file; recorded on the job, never fatal to it
#[derive(Debug, Error)]
pub enum ConversionError {
    /// File extension is not a recognised document or image type
    #[error("unsupported file type: {extension}")]
    UnsupportedType {
        /// The offending extension (".xyz" or "(none)")
        extension: String,
    },

    /// The conversion service did not answer within the per-call timeout
    #[error("conversion timed out after {}s", .after.as_secs())]
    Timeout {
        /// The timeout that elapsed
        after: Duration,
    },

    /// The conversion service answered with a non-success status
    #[error("service returned status {status}: {message}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The conversion service answered with a body we could not interpret
    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    /// The converter panicked while handling the file
    #[error("converter panicked: {0}")]
    Panicked(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job error: job 20250101_120000_000001 not found",
///     "details": {
///       "job_id": "20250101_120000_000001"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::Job(JobError::NotFound { .. }) => 404,
            Error::Job(JobError::ArchiveMissing { .. }) => 404,

            // 409 Conflict - job exists but is not in the required state
            Error::Job(JobError::NotReady { .. }) => 409,

            // 500 - illegal transitions are programming errors
            Error::Job(JobError::AlreadyTerminal { .. }) => 500,
            Error::Job(JobError::ProgressOverflow { .. }) => 500,

            // 502/504 - external conversion service
            Error::Conversion(ConversionError::Timeout { .. }) => 504,
            Error::Conversion(_) => 502,
            Error::Network(_) => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Packaging { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Archive(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "job_not_found",
                JobError::NotReady { .. } => "job_not_ready",
                JobError::AlreadyTerminal { .. } => "already_terminal",
                JobError::ProgressOverflow { .. } => "progress_overflow",
                JobError::ArchiveMissing { .. } => "archive_missing",
            },
            Error::Conversion(e) => match e {
                ConversionError::UnsupportedType { .. } => "unsupported_type",
                ConversionError::Timeout { .. } => "conversion_timeout",
                ConversionError::Backend { .. } => "conversion_failed",
                ConversionError::MalformedResponse(_) => "malformed_response",
                ConversionError::Panicked(_) => "converter_panicked",
            },
            Error::Packaging { .. } => "packaging_failed",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Archive(_) => "archive_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Job(JobError::NotFound { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Job(JobError::NotReady { id, status }) => Some(serde_json::json!({
                "job_id": id,
                "status": status,
            })),
            Error::Job(JobError::AlreadyTerminal { id, status }) => Some(serde_json::json!({
                "job_id": id,
                "status": status,
            })),
            Error::Job(JobError::ArchiveMissing { id, path }) => Some(serde_json::json!({
                "job_id": id,
                "path": path,
            })),
            Error::Packaging { job_id, .. } => Some(serde_json::json!({
                "job_id": job_id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn job_id() -> JobId {
        JobId::from("20250101_120000_000001")
    }

    /// Returns (Error, expected_status_code, expected_error_code) for the
    /// variants a client can actually observe.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("processing.max_concurrent_jobs".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::Validation("no files uploaded".into()),
                400,
                "validation_error",
            ),
            (
                Error::Job(JobError::NotFound { id: job_id() }),
                404,
                "job_not_found",
            ),
            (
                Error::Job(JobError::NotReady {
                    id: job_id(),
                    status: JobStatus::Processing,
                }),
                409,
                "job_not_ready",
            ),
            (
                Error::Job(JobError::AlreadyTerminal {
                    id: job_id(),
                    status: JobStatus::Completed,
                }),
                500,
                "already_terminal",
            ),
            (
                Error::Job(JobError::ArchiveMissing {
                    id: job_id(),
                    path: PathBuf::from("/tmp/x.zip"),
                }),
                404,
                "archive_missing",
            ),
            (
                Error::Conversion(ConversionError::Timeout {
                    after: Duration::from_secs(300),
                }),
                504,
                "conversion_timeout",
            ),
            (
                Error::Conversion(ConversionError::Backend {
                    status: 500,
                    message: "CUDA out of memory".into(),
                }),
                502,
                "conversion_failed",
            ),
            (
                Error::Packaging {
                    job_id: job_id(),
                    reason: "disk full".into(),
                },
                500,
                "packaging_failed",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
            (Error::Other("boom".into()), 500, "internal_error"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "status for {error}");
            assert_eq!(error.error_code(), code, "code for {error}");
        }
    }

    #[test]
    fn not_ready_is_conflict_not_not_found() {
        let err = Error::Job(JobError::NotReady {
            id: job_id(),
            status: JobStatus::Queued,
        });
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn unsupported_type_message_names_extension() {
        let err = ConversionError::UnsupportedType {
            extension: ".xyz".into(),
        };
        assert_eq!(err.to_string(), "unsupported file type: .xyz");
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = ConversionError::Timeout {
            after: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "conversion timed out after 300s");
    }

    #[test]
    fn api_error_from_job_not_found_has_job_id() {
        let api: ApiError = Error::Job(JobError::NotFound { id: job_id() }).into();

        assert_eq!(api.error.code, "job_not_found");
        let details = api.error.details.expect("details should be present");
        assert_eq!(details["job_id"], "20250101_120000_000001");
    }

    #[test]
    fn api_error_from_not_ready_has_status() {
        let api: ApiError = Error::Job(JobError::NotReady {
            id: job_id(),
            status: JobStatus::Processing,
        })
        .into();

        let details = api.error.details.unwrap();
        assert_eq!(details["status"], "processing");
    }

    #[test]
    fn api_error_from_validation_has_no_details() {
        let api: ApiError = Error::Validation("no files uploaded".into()).into();

        assert_eq!(api.error.code, "validation_error");
        assert!(api.error.message.contains("no files uploaded"));
        assert!(api.error.details.is_none());
    }

    #[test]
    fn api_error_without_details_omits_details_in_json() {
        let api = ApiError::new("test_code", "test message");

        let json_str = serde_json::to_string(&api).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();

        assert_eq!(parsed["error"]["code"], "test_code");
        assert!(parsed["error"].get("details").is_none());
    }

    #[test]
    fn api_error_message_matches_error_display() {
        let err = Error::Packaging {
            job_id: job_id(),
            reason: "permission denied".into(),
        };
        let display_msg = err.to_string();
        let api: ApiError = err.into();

        assert_eq!(api.error.message, display_msg);
        assert_eq!(api.error.details.unwrap()["job_id"], "20250101_120000_000001");
    }
}
