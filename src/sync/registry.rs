use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApertureError;

#[derive(Debug)]
struct ActiveRun {
    id: Uuid,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Process-wide single-flight slot for sync runs.
///
/// `try_begin` is a test-and-set under one lock with no await in between.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    slot: Arc<Mutex<Option<ActiveRun>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the slot, or fails with [`ApertureError::SyncInProgress`].
    pub fn try_begin(&self) -> Result<RunGuard, ApertureError> {
        let mut slot = self.lock();
        if let Some(active) = slot.as_ref() {
            debug!(run_id = %active.id, "sync slot busy");
            return Err(ApertureError::SyncInProgress);
        }

        let run = ActiveRun {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        };
        let guard = RunGuard {
            registry: self.clone(),
            id: run.id,
            cancel: run.cancel.clone(),
        };
        info!(run_id = %run.id, "sync run started");
        *slot = Some(run);
        Ok(guard)
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().as_ref().map(|run| run.started_at)
    }

    /// Signals the active run to stop. Returns whether a run was active.
    pub fn cancel_active(&self) -> bool {
        match self.lock().as_ref() {
            Some(run) => {
                info!(run_id = %run.id, "cancelling active sync run");
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Ownership of the registry slot; dropping it frees the slot.
#[derive(Debug)]
pub struct RunGuard {
    registry: RunRegistry,
    id: Uuid,
    cancel: CancellationToken,
}

impl RunGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut slot = self.registry.lock();
        if slot.as_ref().is_some_and(|run| run.id == self.id) {
            *slot = None;
            debug!(run_id = %self.id, "sync slot released");
        }
    }
}
