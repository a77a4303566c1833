//! Conversation messages attached to leads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{LeadId, MessageId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    #[default]
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<LeadId>,

    #[serde(default, alias = "body", alias = "text")]
    pub content: String,

    #[serde(default)]
    pub direction: MessageDirection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<Timestamp>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ConversationMessage {
    pub fn new(content: impl Into<String>, direction: MessageDirection) -> Self {
        Self {
            id: None,
            lead_id: None,
            content: content.into(),
            direction,
            sent_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Upserts a message into a thread: same id replaces, otherwise appends.
pub fn upsert_message(thread: &mut Vec<ConversationMessage>, message: ConversationMessage) {
    if let Some(id) = &message.id {
        if let Some(existing) = thread.iter_mut().find(|m| m.id.as_ref() == Some(id)) {
            *existing = message;
            return;
        }
    }
    thread.push(message);
}
