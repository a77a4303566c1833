//! Dashboard headline metrics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_leads: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_conversations: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}
