//! Route handlers for the REST API
//!
//! - [`jobs`] - Submission, status polling, archive download
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

/// Query parameters for GET /health
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct HealthQuery {
    /// Also check the conversion backend (default: false)
    #[serde(default)]
    pub deep: bool,
}
