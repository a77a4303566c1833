//! Realtime session - owns one dashboard's sync stack.
//!
//! Replaces a process-wide singleton with an explicit context object: the
//! store, router, connection manager and coordinator live exactly as long as
//! the session that built them.

use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError};

use super::connection_manager::{ConnectionManager, ConnectionSettings, SendError};
use super::event_adapter::StoreEventAdapter;
use super::event_router::{EventRouter, Subscription};
use super::optimistic::{MutationError, OptimisticCoordinator};
use super::store::Store;
use crate::domain::connection::ConnectionState;
use crate::domain::foundation::{LeadId, StageId, UserId};
use crate::domain::pipeline::Action;
use crate::ports::{ApiError, InboundSink, PipelineApi, TransportConnector};

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub connection: ConnectionSettings,
    pub replay_queue_capacity: usize,
}

pub struct RealtimeSession {
    store: Arc<Store>,
    router: Arc<EventRouter>,
    connection: ConnectionManager,
    coordinator: OptimisticCoordinator,
    api: Arc<dyn PipelineApi>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl RealtimeSession {
    pub fn new(
        api: Arc<dyn PipelineApi>,
        connector: Arc<dyn TransportConnector>,
        settings: SessionSettings,
    ) -> Self {
        let store = Arc::new(Store::new());
        let router = EventRouter::new(settings.replay_queue_capacity);
        let connection = ConnectionManager::new(
            connector,
            Arc::clone(&router) as Arc<dyn InboundSink>,
            settings.connection,
        );

        let status_store = Arc::clone(&store);
        connection.add_observer(Arc::new(
            move |_previous: ConnectionState, current: ConnectionState| {
                status_store.dispatch(Action::SetConnectionStatus(current));
            },
        ));

        let coordinator = OptimisticCoordinator::new(Arc::clone(&store), Arc::clone(&api));

        Self {
            store,
            router,
            connection,
            coordinator,
            api,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Connects, loads the initial pipeline, then wires events into the store.
    ///
    /// The channel opens first so nothing is missed during the load. Events
    /// arriving meanwhile wait in the router's replay queue and are applied
    /// on top of the loaded state once the store subscribes.
    ///
    /// # Errors
    ///
    /// Returns the API error when stages or leads cannot be loaded; the
    /// channel is disconnected again in that case. A metrics failure is only
    /// logged.
    pub async fn start(&self) -> Result<(), ApiError> {
        self.connection.connect();

        let (stages, leads, metrics) = tokio::join!(
            self.api.fetch_stages(),
            self.api.fetch_leads(),
            self.api.fetch_metrics(),
        );
        let (stages, leads) = match (stages, leads) {
            (Ok(stages), Ok(leads)) => (stages, leads),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "initial pipeline load failed");
                self.connection.disconnect();
                return Err(e);
            }
        };
        tracing::info!(stages = stages.len(), leads = leads.len(), "initial pipeline loaded");

        self.store.dispatch(Action::SetStages(stages));
        self.store.dispatch(Action::SetLeads(leads));
        match metrics {
            Ok(metrics) => self.store.dispatch(Action::SetMetrics(metrics)),
            Err(e) => tracing::warn!(error = %e, "initial metrics unavailable"),
        }

        {
            let mut subscriptions = self.lock_subscriptions();
            if subscriptions.is_empty() {
                *subscriptions = StoreEventAdapter::register(Arc::clone(&self.store), &self.router);
            }
        }
        self.router.mark_ready();
        Ok(())
    }

    /// Disconnects, then releases the store's event subscriptions. The router
    /// goes back to queueing so a later `start()` replays events that race
    /// its load.
    pub fn shutdown(&self) {
        self.connection.disconnect();
        let subscriptions = std::mem::take(&mut *self.lock_subscriptions());
        for subscription in &subscriptions {
            subscription.unsubscribe();
        }
        self.router.mark_not_ready();
        tracing::info!(released = subscriptions.len(), "session shut down");
    }

    /// Fetches one lead's conversation into the store.
    pub async fn load_conversation(&self, lead_id: &LeadId) -> Result<(), ApiError> {
        let messages = self.api.fetch_conversation(lead_id).await?;
        self.store.dispatch(Action::SetConversation {
            lead_id: lead_id.clone(),
            messages,
        });
        Ok(())
    }

    pub fn select_lead(&self, lead_id: Option<LeadId>) {
        self.store.dispatch(Action::SetSelectedLead(lead_id));
    }

    pub async fn move_lead_to_stage(
        &self,
        lead_id: &LeadId,
        target: StageId,
    ) -> Result<(), MutationError> {
        self.coordinator.move_lead_to_stage(lead_id, target).await
    }

    pub async fn assign_lead(
        &self,
        lead_id: &LeadId,
        assignee: Option<UserId>,
    ) -> Result<(), MutationError> {
        self.coordinator.assign_lead(lead_id, assignee).await
    }

    pub fn send(&self, event_type: &str, payload: JsonValue) -> Result<(), SendError> {
        self.connection.send(event_type, payload)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn coordinator(&self) -> &OptimisticCoordinator {
        &self.coordinator
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
