//! Background service starters - janitor and REST API server.

use crate::error::Result;
use crate::janitor::Janitor;
use std::sync::Arc;

use super::BatchService;

impl BatchService {
    /// Build a janitor over this service's artifact roots and registry
    pub fn janitor(&self) -> Janitor {
        Janitor::new(
            self.registry.clone(),
            vec![
                self.config.upload_dir().clone(),
                self.config.results_dir().clone(),
            ],
            self.config.retention.max_age,
            self.event_tx.clone(),
        )
    }

    /// Start the janitor background task
    ///
    /// The first sweep runs immediately. Returns `None` when retention is
    /// disabled. The task stops when [`shutdown`](Self::shutdown) is called.
    pub fn start_janitor(&self) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.retention.enabled {
            tracing::info!("Retention disabled, skipping janitor");
            return None;
        }

        let janitor = self.janitor();
        let interval = self.config.retention.sweep_interval;
        let cancel = self.admission.shutdown.child_token();

        let handle = tokio::spawn(janitor.run(interval, cancel));
        tracing::info!("Janitor background task started");
        Some(handle)
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:8001)
    /// and stops when [`shutdown`](Self::shutdown) is called.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let service = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(service, config).await })
    }
}
