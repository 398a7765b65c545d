//! Application state for the API server

use crate::{BatchService, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator every handler delegates to
    pub service: Arc<BatchService>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<BatchService>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}
