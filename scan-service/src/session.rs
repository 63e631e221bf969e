//! Single-slot scan gate.
//!
//! At most one scan session exists at a time. Periodic passes use
//! [`ScanGate::try_begin`] and give up when the slot is taken; single-tab
//! scans use [`ScanGate::begin`] and wait for it. The session owns the slot
//! and hands it back when dropped.

use alert_core::CoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanKind {
    /// Scheduler tick.
    Periodic,
    /// Full pass requested from the UI.
    Requested,
    /// One tab, requested from the UI.
    Tab,
    /// First scan of a tab opened by auto-open.
    AutoOpen,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanKind::Periodic => "periodic",
            ScanKind::Requested => "requested",
            ScanKind::Tab => "tab",
            ScanKind::AutoOpen => "auto-open",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub kind: ScanKind,
    pub started_at: DateTime<Utc>,
}

struct ActiveSession {
    info: SessionInfo,
    cancel: watch::Sender<bool>,
}

#[derive(Default)]
struct GateState {
    active: Mutex<Option<ActiveSession>>,
}

impl GateState {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct ScanGate {
    slot: Arc<Semaphore>,
    state: Arc<GateState>,
}

impl ScanGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            state: Arc::new(GateState::default()),
        }
    }

    /// Takes the slot if it is free.
    pub fn try_begin(&self, kind: ScanKind) -> Option<ScanSession> {
        let permit = self.slot.clone().try_acquire_owned().ok()?;
        Some(self.open(kind, permit))
    }

    /// Waits up to `wait` for the slot.
    pub async fn begin(&self, kind: ScanKind, wait: Duration) -> Result<ScanSession, CoreError> {
        match timeout(wait, self.slot.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.open(kind, permit)),
            Ok(Err(_)) => Err(CoreError::Internal {
                message: "scan gate closed".to_string(),
            }),
            Err(_) => Err(CoreError::Timeout {
                seconds: wait.as_secs(),
            }),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    pub fn current(&self) -> Option<SessionInfo> {
        self.state.lock().as_ref().map(|s| s.info.clone())
    }

    /// Signals the running session to stop after its current step.
    pub fn cancel_current(&self) -> bool {
        match self.state.lock().as_ref() {
            Some(active) => {
                active.cancel.send_replace(true);
                debug!("Cancelled scan session {}", active.info.id);
                true
            }
            None => false,
        }
    }

    fn open(&self, kind: ScanKind, permit: OwnedSemaphorePermit) -> ScanSession {
        let info = SessionInfo {
            id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
        };
        let (cancel, cancelled) = watch::channel(false);
        *self.state.lock() = Some(ActiveSession {
            info: info.clone(),
            cancel,
        });
        debug!("Scan session {} ({}) started", info.id, kind);

        ScanSession {
            info,
            cancelled,
            state: self.state.clone(),
            _permit: permit,
        }
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Token for the running scan. Dropping it frees the gate.
pub struct ScanSession {
    info: SessionInfo,
    cancelled: watch::Receiver<bool>,
    state: Arc<GateState>,
    _permit: OwnedSemaphorePermit,
}

impl ScanSession {
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn id(&self) -> Uuid {
        self.info.id
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the session has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        let mut active = self.state.lock();
        if active.as_ref().map(|a| a.info.id) == Some(self.info.id) {
            *active = None;
        }
        debug!("Scan session {} finished", self.info.id);
    }
}
