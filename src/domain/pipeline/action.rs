//! The store's action vocabulary.
//!
//! REST results and real-time events are both expressed as these actions;
//! the reducer never knows which side an action came from.

use super::{ConversationMessage, DashboardMetrics, Lead, LeadPatch, PipelineStage};
use crate::domain::connection::ConnectionState;
use crate::domain::foundation::LeadId;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLeads(Vec<Lead>),
    /// Upsert: an id already present is merged like `UpdateLead`.
    AddLead(Lead),
    /// Merge: absent fields are preserved. Unknown ids are inserted.
    UpdateLead(LeadPatch),
    RemoveLead(LeadId),
    SetStages(Vec<PipelineStage>),
    SetSelectedLead(Option<LeadId>),
    SetMetrics(DashboardMetrics),
    SetConnectionStatus(ConnectionState),
    SetConversation {
        lead_id: LeadId,
        messages: Vec<ConversationMessage>,
    },
    AddMessage {
        lead_id: LeadId,
        message: ConversationMessage,
    },
}

impl Action {
    /// Name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetLeads(_) => "SET_LEADS",
            Action::AddLead(_) => "ADD_LEAD",
            Action::UpdateLead(_) => "UPDATE_LEAD",
            Action::RemoveLead(_) => "REMOVE_LEAD",
            Action::SetStages(_) => "SET_STAGES",
            Action::SetSelectedLead(_) => "SET_SELECTED_LEAD",
            Action::SetMetrics(_) => "SET_METRICS",
            Action::SetConnectionStatus(_) => "SET_CONNECTION_STATUS",
            Action::SetConversation { .. } => "SET_CONVERSATION",
            Action::AddMessage { .. } => "ADD_MESSAGE",
        }
    }
}
