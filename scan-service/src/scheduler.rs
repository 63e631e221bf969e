use crate::orchestrator::ScanOrchestrator;
use alert_core::ErrorExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// How often a disabled scheduler looks at the interval setting again.
pub const DISABLED_RECHECK: Duration = Duration::from_secs(60);

/// Single timer driving periodic passes.
///
/// The interval is read from settings before every wait, so edits take effect
/// on the next cycle. An interval of zero pauses scanning.
pub struct Scheduler {
    orchestrator: Arc<ScanOrchestrator>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<ScanOrchestrator>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            orchestrator,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Scan scheduler started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let minutes = self.interval_minutes().await;
            let wait = if minutes == 0 {
                DISABLED_RECHECK
            } else {
                Duration::from_secs(u64::from(minutes) * 60)
            };
            debug!("Next scheduler tick in {:?}", wait);

            let elapsed = tokio::select! {
                _ = sleep(wait) => true,
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    false
                }
            };

            if elapsed && minutes > 0 {
                self.orchestrator.on_timer().await;
            }
        }
        info!("Scan scheduler stopped");
    }

    async fn interval_minutes(&self) -> u32 {
        match self.orchestrator.settings().load().await {
            Ok(settings) => settings.scan_interval_minutes,
            Err(e) => {
                e.log_warn();
                0
            }
        }
    }
}
