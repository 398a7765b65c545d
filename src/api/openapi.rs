//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time with utoipa and served from
//! `/openapi.json` (and through `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the ocr-batch REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocr-batch REST API",
        version = "0.1.0",
        description = "Batch OCR job orchestration: submit files, poll progress, download markdown results as a zip archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8001", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job_status,
        crate::api::routes::download_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::FileKind,
        crate::types::SubmitResponse,
        crate::types::JobStatusResponse,
        crate::types::Event,

        crate::api::routes::HealthQuery,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Batch jobs - Submit files, poll status, download result archives"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` header scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_job_route() {
        let spec = ApiDoc::openapi();
        for path in ["/jobs", "/jobs/{id}", "/jobs/{id}/download", "/health", "/events"] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path {path}"
            );
        }
    }

    #[test]
    fn has_schemas_and_tags() {
        let spec = ApiDoc::openapi();

        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("JobStatusResponse"));
        assert!(components.schemas.contains_key("ApiError"));
        assert!(components.security_schemes.contains_key("api_key"));

        let tags: Vec<String> = spec
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tags, vec!["jobs".to_string(), "system".to_string()]);
    }

    #[test]
    fn serializes_as_openapi_3() {
        let json = serde_json::to_value(ApiDoc::openapi()).expect("Should serialize to JSON");
        let version = json.get("openapi").and_then(|v| v.as_str()).unwrap();
        assert!(version.starts_with("3."));
        assert_eq!(json["info"]["title"], "ocr-batch REST API");
    }
}
