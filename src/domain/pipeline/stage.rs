//! Pipeline stage descriptor.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StageId;

/// One column of the pipeline board. Loaded once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: StageId,
    pub name: String,
    #[serde(default, alias = "order")]
    pub display_order: i32,
}

impl PipelineStage {
    pub fn new(id: StageId, name: impl Into<String>, display_order: i32) -> Self {
        Self {
            id,
            name: name.into(),
            display_order,
        }
    }
}

/// Sorts stages for display. Stable, so equal orders keep their input order.
pub fn sort_for_display(stages: &mut [PipelineStage]) {
    stages.sort_by_key(|s| s.display_order);
}
