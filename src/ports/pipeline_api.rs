//! PipelineApi port - REST collaborator for pipeline data.
//!
//! The dashboard's CRUD endpoints are opaque request/response calls. Results
//! re-enter the store as actions; nothing here touches state directly.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, LeadId, StageId, UserId};
use crate::domain::pipeline::{ConversationMessage, DashboardMetrics, Lead, PipelineStage};

/// Port for the pipeline REST backend.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn fetch_stages(&self) -> Result<Vec<PipelineStage>, ApiError>;

    async fn fetch_leads(&self) -> Result<Vec<Lead>, ApiError>;

    async fn fetch_metrics(&self) -> Result<DashboardMetrics, ApiError>;

    async fn fetch_conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<ConversationMessage>, ApiError>;

    /// Persists a stage move. Used by the optimistic coordinator.
    async fn update_lead_stage(&self, lead_id: &LeadId, stage_id: &StageId)
        -> Result<(), ApiError>;

    /// Persists an assignment. `None` unassigns.
    async fn assign_lead(&self, lead_id: &LeadId, assignee: Option<&UserId>)
        -> Result<(), ApiError>;
}

/// Errors from the REST backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rejected by server: {0}")]
    Rejected(String),

    #[error("server unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ApiError::Parse(message.into())
    }
}

impl From<ApiError> for DomainError {
    fn from(err: ApiError) -> Self {
        let code = match &err {
            ApiError::NotFound(_) => ErrorCode::LeadNotFound,
            ApiError::Unauthorized => ErrorCode::Unauthorized,
            ApiError::Parse(_) => ErrorCode::DecodeError,
            ApiError::Rejected(_) | ApiError::Unavailable(_) | ApiError::Network(_) => {
                ErrorCode::PersistenceFailed
            }
        };
        DomainError::new(code, err.to_string())
    }
}
