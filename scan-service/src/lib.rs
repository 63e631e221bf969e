use alert_core::CoreError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub mod actions;
pub mod browser;
pub mod notifier;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod tests;

pub use actions::{handle_action, handle_message, Action, ActionReply};
pub use browser::{BrowserHost, ScanOutcome, TabInfo};
pub use notifier::{match_summary, DesktopNotifier, Notifier, NOTIFICATION_TITLE};
pub use orchestrator::{PassSummary, ScanOrchestrator, ScanReport, ScanStatus};
pub use registry::TabRegistry;
pub use scheduler::Scheduler;
pub use session::{ScanGate, ScanKind, ScanSession, SessionInfo};

/// Background scanning: owns the scheduler task for an orchestrator.
pub struct ScanService {
    orchestrator: Arc<ScanOrchestrator>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ScanService {
    pub fn new(orchestrator: Arc<ScanOrchestrator>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            orchestrator,
            shutdown,
            handle: None,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ScanOrchestrator> {
        &self.orchestrator
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.shutdown.send_replace(false);
        let scheduler = Scheduler::new(self.orchestrator.clone(), self.shutdown.subscribe());
        self.handle = Some(scheduler.spawn());
        info!("Scan service started");
    }

    /// Stops the scheduler and cancels a pass that is still running.
    pub async fn stop(&mut self) -> Result<(), CoreError> {
        self.shutdown.send_replace(true);
        self.orchestrator.cancel_scan();
        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|e| CoreError::Internal {
                message: format!("scheduler task failed: {}", e),
            })?;
        }
        info!("Scan service stopped");
        Ok(())
    }
}
