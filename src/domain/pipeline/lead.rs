//! Lead entity and its partial-update form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{LeadId, StageId, UserId};

/// A lead in the pipeline.
///
/// Only the fields the core reasons about are typed; everything else the
/// backend sends rides along in `extra` and serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<StageId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Lead {
    pub fn new(id: LeadId) -> Self {
        Self {
            id,
            stage_id: None,
            score: None,
            assigned_to: None,
            extra: Map::new(),
        }
    }

    pub fn in_stage(mut self, stage_id: StageId) -> Self {
        self.stage_id = Some(stage_id);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Merges a patch into this lead. Fields absent from the patch are kept.
    pub fn merge(&mut self, patch: &LeadPatch) {
        debug_assert_eq!(self.id, patch.id);
        if let Some(stage_id) = &patch.stage_id {
            self.stage_id = stage_id.clone();
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = assigned_to.clone();
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Reads a lead from an event payload, unwrapping `{ "lead": {...} }` if present.
    pub fn from_payload(payload: &JsonValue) -> Result<Self, serde_json::Error> {
        let body = payload.get("lead").unwrap_or(payload);
        Lead::deserialize(body)
    }
}

/// Partial lead used by UPDATE_LEAD.
///
/// Typed fields are tri-state: `None` = absent (keep), `Some(None)` = explicit
/// null (clear), `Some(Some(v))` = overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub id: LeadId,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub stage_id: Option<Option<StageId>>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<Option<f64>>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<UserId>>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A field that appears in the input is `Some`, even when its value is null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl LeadPatch {
    pub fn new(id: LeadId) -> Self {
        Self {
            id,
            stage_id: None,
            score: None,
            assigned_to: None,
            extra: Map::new(),
        }
    }

    pub fn with_stage(mut self, stage_id: Option<StageId>) -> Self {
        self.stage_id = Some(stage_id);
        self
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_assignee(mut self, assigned_to: Option<UserId>) -> Self {
        self.assigned_to = Some(assigned_to);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Reads a patch from an event payload, unwrapping `{ "lead": {...} }` if present.
    pub fn from_payload(payload: &JsonValue) -> Result<Self, serde_json::Error> {
        let body = payload.get("lead").unwrap_or(payload);
        LeadPatch::deserialize(body)
    }
}

impl From<LeadPatch> for Lead {
    fn from(patch: LeadPatch) -> Self {
        Lead {
            id: patch.id,
            stage_id: patch.stage_id.flatten(),
            score: patch.score.flatten(),
            assigned_to: patch.assigned_to.flatten(),
            extra: patch.extra,
        }
    }
}

/// A full lead as a patch: present fields overwrite, absent ones are kept.
impl From<Lead> for LeadPatch {
    fn from(lead: Lead) -> Self {
        LeadPatch {
            id: lead.id,
            stage_id: lead.stage_id.map(Some),
            score: lead.score.map(Some),
            assigned_to: lead.assigned_to.map(Some),
            extra: lead.extra,
        }
    }
}
