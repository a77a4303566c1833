//! Translates routed envelopes into store actions.
//!
//! This is the remote half of the single reducer entry point: envelopes
//! become the same `Action`s that REST results produce.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use super::event_router::{EventRouter, Subscription};
use super::store::Store;
use crate::domain::foundation::{EventEnvelope, EventType, LeadId, StageId, UserId};
use crate::domain::pipeline::{Action, ConversationMessage, DashboardMetrics, Lead, LeadPatch};
use crate::ports::EventHandler;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed {event_type} payload: {source}")]
    Payload {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },

    #[error("{event_type} payload has no {field}")]
    MissingField {
        event_type: EventType,
        field: &'static str,
    },
}

const LEAD_ID_KEYS: &[&str] = &["leadId", "id"];
const STAGE_KEYS: &[&str] = &["stageId", "toStageId", "newStageId"];
const ASSIGNEE_KEYS: &[&str] = &["assignedTo", "assigneeId", "userId"];

/// Maps one envelope to the action it implies. `Ok(None)` for types that
/// have no store effect.
pub fn action_for(envelope: &EventEnvelope) -> Result<Option<Action>, AdapterError> {
    let event_type = &envelope.event_type;
    let payload = &envelope.payload;
    let malformed = |source| AdapterError::Payload {
        event_type: event_type.clone(),
        source,
    };
    let missing = |field| AdapterError::MissingField {
        event_type: event_type.clone(),
        field,
    };

    let action = match event_type {
        EventType::LeadCreated => Action::AddLead(Lead::from_payload(payload).map_err(malformed)?),
        EventType::LeadUpdated => {
            Action::UpdateLead(LeadPatch::from_payload(payload).map_err(malformed)?)
        }
        EventType::StageChanged => {
            let body = lead_body(payload);
            let id: LeadId = read_first(body, LEAD_ID_KEYS)
                .ok_or_else(|| missing("leadId"))?
                .map_err(malformed)?;
            let stage: Option<StageId> = read_first(body, STAGE_KEYS)
                .ok_or_else(|| missing("stageId"))?
                .map_err(malformed)?;
            Action::UpdateLead(LeadPatch::new(id).with_stage(stage))
        }
        EventType::LeadAssigned => {
            let body = lead_body(payload);
            let id: LeadId = read_first(body, LEAD_ID_KEYS)
                .ok_or_else(|| missing("leadId"))?
                .map_err(malformed)?;
            let assignee: Option<UserId> = read_first(body, ASSIGNEE_KEYS)
                .ok_or_else(|| missing("assignedTo"))?
                .map_err(malformed)?;
            Action::UpdateLead(LeadPatch::new(id).with_assignee(assignee))
        }
        EventType::NewMessage | EventType::NewMessageForSales => {
            let body = payload.get("message").unwrap_or(payload);
            let message: ConversationMessage =
                serde_json::from_value(body.clone()).map_err(malformed)?;
            let lead_id: LeadId = match read_first(payload, &["leadId"]) {
                Some(id) => id.map_err(malformed)?,
                None => message.lead_id.clone().ok_or_else(|| missing("leadId"))?,
            };
            Action::AddMessage { lead_id, message }
        }
        EventType::MetricsUpdate => {
            let body = payload.get("metrics").unwrap_or(payload);
            let metrics: DashboardMetrics =
                serde_json::from_value(body.clone()).map_err(malformed)?;
            Action::SetMetrics(metrics)
        }
        EventType::UpdateBot | EventType::Other(_) => return Ok(None),
    };
    Ok(Some(action))
}

fn lead_body(payload: &JsonValue) -> &JsonValue {
    payload.get("lead").unwrap_or(payload)
}

/// Reads the first present key. `None` when no key is present; a present
/// `null` is still returned so the caller can decide what it means.
fn read_first<T: DeserializeOwned>(
    body: &JsonValue,
    keys: &[&str],
) -> Option<Result<T, serde_json::Error>> {
    keys.iter()
        .find_map(|key| body.get(*key))
        .map(|value| T::deserialize(value))
}

/// Subscribes the store to every known event type.
pub struct StoreEventAdapter {
    store: Arc<Store>,
}

impl StoreEventAdapter {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Registers one shared adapter for each known type.
    pub fn register(store: Arc<Store>, router: &Arc<EventRouter>) -> Vec<Subscription> {
        let adapter: Arc<dyn EventHandler> = Arc::new(Self::new(store));
        EventType::KNOWN
            .iter()
            .map(|event_type| router.subscribe(event_type.clone(), Arc::clone(&adapter)))
            .collect()
    }
}

impl EventHandler for StoreEventAdapter {
    fn handle(&self, envelope: &EventEnvelope) {
        match action_for(envelope) {
            Ok(Some(action)) => self.store.dispatch(action),
            Ok(None) => {
                tracing::trace!(event_type = %envelope.event_type, "no store effect");
            }
            Err(e) => {
                tracing::warn!(error = %e, event_type = %envelope.event_type, "dropping event");
            }
        }
    }

    fn name(&self) -> &'static str {
        "StoreEventAdapter"
    }
}
