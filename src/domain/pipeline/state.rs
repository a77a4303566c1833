//! Canonical dashboard state.
//!
//! Only the reducer writes these fields. The per-stage index is derived from
//! the lead collection and rebuilt at the end of every reducer pass.

use std::collections::HashMap;

use super::{ConversationMessage, DashboardMetrics, Lead, PipelineStage};
use crate::domain::connection::ConnectionState;
use crate::domain::foundation::{LeadId, StageId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub(super) leads: Vec<Lead>,
    pub(super) stage_index: HashMap<StageId, Vec<LeadId>>,
    pub(super) stages: Vec<PipelineStage>,
    pub(super) selected_lead: Option<LeadId>,
    pub(super) conversations: HashMap<LeadId, Vec<ConversationMessage>>,
    pub(super) metrics: DashboardMetrics,
    pub(super) connection_status: ConnectionState,
}

impl DashboardState {
    /// All leads, in first-seen order.
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn lead(&self, id: &LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| &l.id == id)
    }

    pub fn contains_lead(&self, id: &LeadId) -> bool {
        self.lead(id).is_some()
    }

    /// Derived view: ids of the leads currently in `stage_id`, in collection order.
    pub fn lead_ids_in_stage(&self, stage_id: &StageId) -> &[LeadId] {
        self.stage_index
            .get(stage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Derived view resolved to leads.
    pub fn leads_in_stage(&self, stage_id: &StageId) -> Vec<&Lead> {
        self.lead_ids_in_stage(stage_id)
            .iter()
            .filter_map(|id| self.lead(id))
            .collect()
    }

    pub fn stage_index(&self) -> &HashMap<StageId, Vec<LeadId>> {
        &self.stage_index
    }

    /// Stages sorted by display order.
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn stage(&self, id: &StageId) -> Option<&PipelineStage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn selected_lead_id(&self) -> Option<&LeadId> {
        self.selected_lead.as_ref()
    }

    pub fn selected_lead(&self) -> Option<&Lead> {
        self.selected_lead.as_ref().and_then(|id| self.lead(id))
    }

    pub fn conversation(&self, lead_id: &LeadId) -> &[ConversationMessage] {
        self.conversations
            .get(lead_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn metrics(&self) -> &DashboardMetrics {
        &self.metrics
    }

    pub fn connection_status(&self) -> ConnectionState {
        self.connection_status
    }

    /// Rebuilds the derived stage index from the lead collection.
    pub(super) fn reindex(&mut self) {
        let mut index: HashMap<StageId, Vec<LeadId>> = HashMap::new();
        for lead in &self.leads {
            if let Some(stage_id) = &lead.stage_id {
                index.entry(stage_id.clone()).or_default().push(lead.id.clone());
            }
        }
        self.stage_index = index;
    }

    /// Checks the standing invariants: unique lead ids, and for every stage
    /// the index equals the lead collection filtered by that stage.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for lead in &self.leads {
            if !seen.insert(&lead.id) {
                return Err(format!("lead {} appears twice", lead.id));
            }
        }

        let mut stage_ids: Vec<&StageId> = self.stage_index.keys().collect();
        stage_ids.extend(self.leads.iter().filter_map(|l| l.stage_id.as_ref()));
        stage_ids.extend(self.stages.iter().map(|s| &s.id));

        for stage_id in stage_ids {
            let expected: Vec<&LeadId> = self
                .leads
                .iter()
                .filter(|l| l.stage_id.as_ref() == Some(stage_id))
                .map(|l| &l.id)
                .collect();
            let actual: Vec<&LeadId> = self.lead_ids_in_stage(stage_id).iter().collect();
            if expected != actual {
                return Err(format!(
                    "stage {} index {:?} != filtered {:?}",
                    stage_id, actual, expected
                ));
            }
        }

        if self.stage_index.values().any(Vec::is_empty) {
            return Err("stage index holds an empty bucket".to_string());
        }

        if let Some(selected) = &self.selected_lead {
            if !self.contains_lead(selected) {
                return Err(format!("selected lead {} is not in the collection", selected));
            }
        }
        Ok(())
    }
}
