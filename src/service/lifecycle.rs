//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::BatchService;

/// How long shutdown waits for running jobs
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl BatchService {
    /// Gracefully shut down the service
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions (`submit` returns [`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Stops background services such as the janitor
    /// 3. Waits up to 30 seconds for queued and running jobs to reach a terminal state
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Jobs are never aborted; any still running after the timeout keep running
    /// until the runtime itself stops.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.admission.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Stop background services
        self.admission.shutdown.cancel();

        // 3. Wait for job tasks with timeout
        self.admission.tracker.close();
        let running = self.admission.tracker.len();
        if running > 0 {
            tracing::info!(running, "Waiting for running jobs to finish");
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.admission.tracker.wait()).await {
            Ok(()) => tracing::info!("All jobs finished"),
            Err(_) => tracing::warn!(
                remaining = self.admission.tracker.len(),
                "Timeout waiting for jobs to finish, proceeding with shutdown"
            ),
        }

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are still accepted
    pub fn is_accepting(&self) -> bool {
        self.admission.accepting_new.load(Ordering::SeqCst)
    }
}
