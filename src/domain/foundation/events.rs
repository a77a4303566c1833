//! Real-time event envelope and its wire format.
//!
//! The server pushes `{ "type": "...", "payload": ... }` objects over the live
//! channel. Older producers use `data` instead of `payload`; both are accepted
//! and `payload` wins when both are present.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

use super::Timestamp;

/// Event types consumed by the dashboard core.
///
/// This is an open union: anything the server sends that is not one of the
/// known names lands in `Other` and routes like any other type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    LeadCreated,
    LeadUpdated,
    StageChanged,
    LeadAssigned,
    NewMessage,
    MetricsUpdate,
    /// Legacy bot status push.
    UpdateBot,
    /// Legacy alias of `NewMessage` scoped to one lead.
    NewMessageForSales,
    Other(String),
}

impl EventType {
    /// Every named variant, in wire order.
    pub const KNOWN: [EventType; 8] = [
        EventType::LeadCreated,
        EventType::LeadUpdated,
        EventType::StageChanged,
        EventType::LeadAssigned,
        EventType::NewMessage,
        EventType::MetricsUpdate,
        EventType::UpdateBot,
        EventType::NewMessageForSales,
    ];

    /// Parses a wire name. Total: unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "LEAD_CREATED" => EventType::LeadCreated,
            "LEAD_UPDATED" => EventType::LeadUpdated,
            "STAGE_CHANGED" => EventType::StageChanged,
            "LEAD_ASSIGNED" => EventType::LeadAssigned,
            "NEW_MESSAGE" => EventType::NewMessage,
            "METRICS_UPDATE" => EventType::MetricsUpdate,
            "UPDATE_BOT" => EventType::UpdateBot,
            "NEW_MESSAGE_FOR_SALES" => EventType::NewMessageForSales,
            other => EventType::Other(other.to_string()),
        }
    }

    /// The wire name.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::LeadCreated => "LEAD_CREATED",
            EventType::LeadUpdated => "LEAD_UPDATED",
            EventType::StageChanged => "STAGE_CHANGED",
            EventType::LeadAssigned => "LEAD_ASSIGNED",
            EventType::NewMessage => "NEW_MESSAGE",
            EventType::MetricsUpdate => "METRICS_UPDATE",
            EventType::UpdateBot => "UPDATE_BOT",
            EventType::NewMessageForSales => "NEW_MESSAGE_FOR_SALES",
            EventType::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        EventType::parse(name)
    }
}

/// A decoded unit of real-time data. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event_type: EventType,
    pub payload: JsonValue,
    pub received_at: Timestamp,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<EventType>, payload: JsonValue) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            received_at: Timestamp::now(),
        }
    }

    /// Decodes one wire message.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the text is not JSON, is not an object,
    /// or lacks a string `type` field.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let wire: WireEnvelope = serde_json::from_str(raw)?;
        if wire.event_type.is_empty() {
            return Err(DecodeError::MissingType);
        }
        let payload = wire.payload.or(wire.data).unwrap_or(JsonValue::Null);

        Ok(Self {
            event_type: EventType::parse(&wire.event_type),
            payload,
            received_at: Timestamp::now(),
        })
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: Option<JsonValue>,
    #[serde(default)]
    data: Option<JsonValue>,
}

/// Why a wire message could not become an envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("envelope has an empty type")]
    MissingType,
}
