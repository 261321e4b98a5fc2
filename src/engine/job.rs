//! Running jobs and the single active-job slot

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{ExportPlan, ProgressSource};

/// One started export
pub struct Job {
    pub id: JobId,
    pub plan: ExportPlan,
    source: Arc<dyn ProgressSource>,
}

impl Job {
    pub fn new(plan: ExportPlan, source: Arc<dyn ProgressSource>) -> Self {
        Self {
            id: plan.job_id,
            plan,
            source,
        }
    }

    pub fn source(&self) -> Arc<dyn ProgressSource> {
        Arc::clone(&self.source)
    }

    pub fn destination(&self) -> &PathBuf {
        &self.plan.destination
    }
}

/// Caller's view of a started job: resolves exactly once
pub struct JobHandle {
    id: JobId,
    result: oneshot::Receiver<OutcomeResult>,
}

impl JobHandle {
    pub fn new(id: JobId, result: oneshot::Receiver<OutcomeResult>) -> Self {
        Self { id, result }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job's outcome
    pub async fn wait(self) -> OutcomeResult {
        self.result.await.unwrap_or_else(|_| OutcomeResult::Failure {
            code: ErrorCode::ProcessingFailed,
            message: "Job ended without producing an outcome".to_string(),
        })
    }
}

struct ActiveJob {
    id: JobId,
    cancel_requested: bool,
    source: Option<Arc<dyn ProgressSource>>,
}

/// Holds at most one active job.
///
/// Mutated only by job start, `cancel` and the bridge's terminal step; a
/// release only clears the slot while it still holds the releasing job.
#[derive(Clone, Default)]
pub struct JobSlot {
    inner: Arc<Mutex<Option<ActiveJob>>>,
}

impl JobSlot {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for `id`, rejecting the claim while another job is active
    pub fn reserve(&self, id: JobId) -> Result<(), DomainError> {
        let mut slot = self.lock();
        if let Some(active) = slot.as_ref() {
            debug!(active = %active.id, rejected = %id, "Job slot occupied");
            return Err(DomainError::JobInProgress);
        }
        *slot = Some(ActiveJob {
            id,
            cancel_requested: false,
            source: None,
        });
        Ok(())
    }

    /// Record the running export of `id`. A cancel that arrived while the
    /// job was starting is applied here.
    pub fn attach(&self, id: JobId, source: Arc<dyn ProgressSource>) {
        let mut slot = self.lock();
        match slot.as_mut() {
            Some(active) if active.id == id => {
                if active.cancel_requested {
                    debug!(job_id = %id, "Applying cancel requested during start");
                    source.cancel();
                }
                active.source = Some(source);
            }
            _ => {
                debug!(job_id = %id, "Job no longer owns the slot; cancelling export");
                source.cancel();
            }
        }
    }

    /// Request abort of the active job. Returns false when idle.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock();
        match slot.as_mut() {
            Some(active) => {
                active.cancel_requested = true;
                if let Some(source) = active.source.as_ref() {
                    source.cancel();
                }
                debug!(job_id = %active.id, "Cancel requested");
                true
            }
            None => false,
        }
    }

    pub fn cancel_requested(&self, id: JobId) -> bool {
        self.lock()
            .as_ref()
            .map(|active| active.id == id && active.cancel_requested)
            .unwrap_or(false)
    }

    /// Clear the slot if it still holds `id`
    pub fn release(&self, id: JobId) -> bool {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(active) if active.id == id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<JobId> {
        self.lock().as_ref().map(|active| active.id)
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_some()
    }
}
