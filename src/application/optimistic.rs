//! Optimistic mutation coordinator.
//!
//! A user mutation is applied to the store at once, persisted through the
//! `PipelineApi`, and reverted if the server rejects it. Mutations on the
//! same lead queue behind each other: the second waits for the first to
//! resolve and then reads its "previous" value from the store. Different
//! leads proceed concurrently. Dropping a mutation future before the server
//! answers counts as a rejection: the change is reverted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use super::store::Store;
use crate::domain::foundation::{DomainError, ErrorCode, LeadId, StageId, UserId};
use crate::domain::pipeline::{Action, DashboardState, LeadPatch};
use crate::ports::{ApiError, PipelineApi};

/// The in-flight change for one lead. Lives only while its persistence call
/// is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub lead_id: LeadId,
    pub change: PendingChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    Stage {
        previous: Option<StageId>,
        target: StageId,
    },
    Assignee {
        previous: Option<UserId>,
        target: Option<UserId>,
    },
}

impl PendingChange {
    fn apply(&self, lead_id: &LeadId) -> LeadPatch {
        match self {
            PendingChange::Stage { target, .. } => {
                LeadPatch::new(lead_id.clone()).with_stage(Some(target.clone()))
            }
            PendingChange::Assignee { target, .. } => {
                LeadPatch::new(lead_id.clone()).with_assignee(target.clone())
            }
        }
    }

    fn revert(&self, lead_id: &LeadId) -> LeadPatch {
        match self {
            PendingChange::Stage { previous, .. } => {
                LeadPatch::new(lead_id.clone()).with_stage(previous.clone())
            }
            PendingChange::Assignee { previous, .. } => {
                LeadPatch::new(lead_id.clone()).with_assignee(previous.clone())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),

    #[error("saving lead {lead_id} failed, change reverted: {source}")]
    PersistenceFailed {
        lead_id: LeadId,
        #[source]
        source: ApiError,
    },
}

impl From<MutationError> for DomainError {
    fn from(err: MutationError) -> Self {
        match &err {
            MutationError::LeadNotFound(id) => {
                DomainError::new(ErrorCode::LeadNotFound, err.to_string())
                    .with_detail("lead_id", id.as_str())
            }
            MutationError::PersistenceFailed { lead_id, .. } => {
                DomainError::new(ErrorCode::PersistenceFailed, err.to_string())
                    .with_detail("lead_id", lead_id.as_str())
            }
        }
    }
}

pub struct OptimisticCoordinator {
    store: Arc<Store>,
    api: Arc<dyn PipelineApi>,
    lead_locks: Mutex<HashMap<LeadId, Arc<AsyncMutex<()>>>>,
    pending: Mutex<HashMap<LeadId, PendingMutation>>,
}

impl OptimisticCoordinator {
    pub fn new(store: Arc<Store>, api: Arc<dyn PipelineApi>) -> Self {
        Self {
            store,
            api,
            lead_locks: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Drag-and-drop stage change.
    pub async fn move_lead_to_stage(
        &self,
        lead_id: &LeadId,
        target: StageId,
    ) -> Result<(), MutationError> {
        let api = Arc::clone(&self.api);
        let optimistic = target.clone();
        self.run(
            lead_id,
            move |state| {
                state.lead(lead_id).map(|lead| PendingChange::Stage {
                    previous: lead.stage_id.clone(),
                    target: optimistic,
                })
            },
            move || async move { api.update_lead_stage(lead_id, &target).await },
        )
        .await
    }

    /// Assignment change. `None` unassigns.
    pub async fn assign_lead(
        &self,
        lead_id: &LeadId,
        assignee: Option<UserId>,
    ) -> Result<(), MutationError> {
        let api = Arc::clone(&self.api);
        let optimistic = assignee.clone();
        self.run(
            lead_id,
            move |state| {
                state.lead(lead_id).map(|lead| PendingChange::Assignee {
                    previous: lead.assigned_to.clone(),
                    target: optimistic,
                })
            },
            move || async move { api.assign_lead(lead_id, assignee.as_ref()).await },
        )
        .await
    }

    /// The in-flight mutation for `lead_id`, if any.
    pub fn pending(&self, lead_id: &LeadId) -> Option<PendingMutation> {
        lock(&self.pending).get(lead_id).cloned()
    }

    async fn run<C, P, Fut>(
        &self,
        lead_id: &LeadId,
        capture: C,
        persist: P,
    ) -> Result<(), MutationError>
    where
        C: FnOnce(&DashboardState) -> Option<PendingChange>,
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let turn = LeadTurn {
            coordinator: self,
            lead_id,
            lock: self.lead_lock(lead_id),
        };
        let _held = turn.lock.lock().await;
        self.apply_and_persist(lead_id, capture, persist).await
    }

    async fn apply_and_persist<C, P, Fut>(
        &self,
        lead_id: &LeadId,
        capture: C,
        persist: P,
    ) -> Result<(), MutationError>
    where
        C: FnOnce(&DashboardState) -> Option<PendingChange>,
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let change = self
            .store
            .read(capture)
            .ok_or_else(|| MutationError::LeadNotFound(lead_id.clone()))?;

        lock(&self.pending).insert(
            lead_id.clone(),
            PendingMutation {
                lead_id: lead_id.clone(),
                change: change.clone(),
            },
        );
        self.store.dispatch(Action::UpdateLead(change.apply(lead_id)));

        let mut in_flight = InFlight {
            coordinator: self,
            lead_id,
            change,
            settled: false,
        };
        let outcome = persist().await;
        in_flight.settle();
        let change = &in_flight.change;

        match outcome {
            Ok(()) => {
                tracing::debug!(lead_id = %lead_id, change = ?change, "mutation persisted");
                Ok(())
            }
            Err(source) => {
                self.store.dispatch(Action::UpdateLead(change.revert(lead_id)));
                tracing::warn!(
                    lead_id = %lead_id,
                    change = ?change,
                    error = %source,
                    "mutation rejected, reverted"
                );
                Err(MutationError::PersistenceFailed {
                    lead_id: lead_id.clone(),
                    source,
                })
            }
        }
    }

    fn lead_lock(&self, lead_id: &LeadId) -> Arc<AsyncMutex<()>> {
        Arc::clone(lock(&self.lead_locks).entry(lead_id.clone()).or_default())
    }

    // Drops the map entry once no other mutation holds or awaits it.
    fn release_lead_lock(&self, lead_id: &LeadId, lead_lock: &Arc<AsyncMutex<()>>) {
        let mut locks = lock(&self.lead_locks);
        if Arc::strong_count(lead_lock) == 2 {
            locks.remove(lead_id);
        }
    }
}

/// One mutation's place in its lead's queue. Releases the lock entry on drop,
/// including when the mutation future is cancelled while waiting.
struct LeadTurn<'a> {
    coordinator: &'a OptimisticCoordinator,
    lead_id: &'a LeadId,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for LeadTurn<'_> {
    fn drop(&mut self) {
        self.coordinator.release_lead_lock(self.lead_id, &self.lock);
    }
}

/// An applied change whose persistence call has not resolved. Dropping it
/// unsettled means the caller cancelled the mutation, and the change is
/// reverted.
struct InFlight<'a> {
    coordinator: &'a OptimisticCoordinator,
    lead_id: &'a LeadId,
    change: PendingChange,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self) {
        self.settled = true;
        lock(&self.coordinator.pending).remove(self.lead_id);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        lock(&self.coordinator.pending).remove(self.lead_id);
        self.coordinator
            .store
            .dispatch(Action::UpdateLead(self.change.revert(self.lead_id)));
        tracing::warn!(
            lead_id = %self.lead_id,
            change = ?self.change,
            "mutation cancelled before persisting, reverted"
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
