//! Job handlers: submit, list, status, download.

use crate::api::AppState;
use crate::error::ApiError;
use crate::types::{JobId, SubmitResponse, UploadedFile};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// POST /jobs - Submit a batch of files for conversion
///
/// Every multipart field carrying a filename is taken as an input file, in
/// the order received. A text field named `prompt` overrides the default prompt.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body(content = Vec<u8>, description = "Files to convert plus optional `prompt` field (multipart/form-data)", content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted", body = SubmitResponse),
        (status = 400, description = "No files uploaded or malformed multipart body"),
        (status = 503, description = "Service is shutting down")
    )
)]
pub async fn submit_job(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();
    let mut prompt: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiError::validation(format!("Malformed multipart body: {}", e))
                    .into_response();
            }
        };

        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(str::to_string);

        match filename {
            Some(filename) => match field.bytes().await {
                Ok(bytes) => files.push(UploadedFile::new(filename, bytes.to_vec())),
                Err(e) => {
                    return ApiError::validation(format!(
                        "Failed to read file '{}': {}",
                        filename, e
                    ))
                    .into_response();
                }
            },
            None if name == "prompt" => match field.text().await {
                Ok(text) => prompt = Some(text),
                Err(e) => {
                    return ApiError::validation(format!("Failed to read prompt: {}", e))
                        .into_response();
                }
            },
            None => {
                tracing::debug!(field = %name, "Ignoring unexpected multipart field");
            }
        }
    }

    match state.service.submit(files, prompt).await {
        Ok(submitted) => {
            // The handle is detached; clients poll or subscribe to events
            let response = SubmitResponse {
                job_id: submitted.job_id,
                total_files: submitted.total_files,
            };
            (StatusCode::ACCEPTED, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /jobs - List all known jobs, newest first
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Status of every job in the registry", body = Vec<crate::types::JobStatusResponse>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.list_jobs().await)
}

/// GET /jobs/:id - Job status
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Current job status", body = crate::types::JobStatusResponse),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.service.status(&JobId::from(id)).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /jobs/:id/download - Download the result archive
#[utoipa::path(
    get,
    path = "/jobs/{id}/download",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Zip archive of markdown results", content_type = "application/zip"),
        (status = 404, description = "Job or archive not found"),
        (status = 409, description = "Job has not completed")
    )
)]
pub async fn download_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = JobId::from(id);
    match state.service.download(&id).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (header::CONTENT_DISPOSITION, content_disposition(&id)),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn content_disposition(id: &JobId) -> String {
    format!("attachment; filename=\"ocr_results_{}.zip\"", id)
}
