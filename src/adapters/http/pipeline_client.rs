//! REST client implementing the `PipelineApi` port.
//!
//! # Endpoints
//!
//! | Call                 | Request                               |
//! |----------------------|---------------------------------------|
//! | `fetch_stages`       | `GET /api/pipeline/stages`            |
//! | `fetch_leads`        | `GET /api/leads`                      |
//! | `fetch_metrics`      | `GET /api/dashboard/metrics`          |
//! | `fetch_conversation` | `GET /api/leads/{id}/messages`        |
//! | `update_lead_stage`  | `PATCH /api/leads/{id}` `{stageId}`   |
//! | `assign_lead`        | `PATCH /api/leads/{id}` `{assignedTo}`|
//!
//! List endpoints may answer with a bare array or wrap it under a named key
//! or `data`; both are accepted.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::endpoints::ChannelEndpoints;
use crate::domain::foundation::{LeadId, StageId, UserId};
use crate::domain::pipeline::{ConversationMessage, DashboardMetrics, Lead, PipelineStage};
use crate::ports::{ApiError, PipelineApi, TokenSource};

pub struct HttpPipelineApi {
    client: Client,
    endpoints: ChannelEndpoints,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl HttpPipelineApi {
    pub fn new(
        endpoints: ChannelEndpoints,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            tokens,
            timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.endpoints
            .api_url(path)
            .map_err(|e| ApiError::network(e.to_string()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret())),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::network(format!("timed out after {}s", self.timeout.as_secs()))
            } else if e.is_connect() {
                ApiError::network(format!("Connection failed: {}", e))
            } else {
                ApiError::network(e.to_string())
            }
        })?;
        handle_response_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path)?)).await?;
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ApiError::parse(format!("Failed to parse response: {}", e)))?;
        serde_json::from_value(unwrap_body(body, key))
            .map_err(|e| ApiError::parse(format!("Unexpected {} shape: {}", key, e)))
    }

    async fn patch_lead(&self, lead_id: &LeadId, body: JsonValue) -> Result<(), ApiError> {
        let path = format!("/api/leads/{}", lead_id);
        self.send(self.client.patch(self.url(&path)?).json(&body))
            .await
            .map(|_| ())
    }
}

/// Maps non-success statuses onto `ApiError`.
async fn handle_response_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound(error_body)),
        400 | 409 | 422 => Err(ApiError::Rejected(error_body)),
        500..=599 => Err(ApiError::Unavailable(format!(
            "Server error {}: {}",
            status, error_body
        ))),
        _ => Err(ApiError::network(format!(
            "Unexpected status {}: {}",
            status, error_body
        ))),
    }
}

/// `{ "<key>": x }` or `{ "data": x }` becomes `x`; anything else passes through.
fn unwrap_body(body: JsonValue, key: &str) -> JsonValue {
    match body {
        JsonValue::Object(mut map) => {
            if let Some(inner) = map.remove(key) {
                inner
            } else if let Some(inner) = map.remove("data") {
                inner
            } else {
                JsonValue::Object(map)
            }
        }
        other => other,
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    async fn fetch_stages(&self) -> Result<Vec<PipelineStage>, ApiError> {
        self.get_json("/api/pipeline/stages", "stages").await
    }

    async fn fetch_leads(&self) -> Result<Vec<Lead>, ApiError> {
        self.get_json("/api/leads", "leads").await
    }

    async fn fetch_metrics(&self) -> Result<DashboardMetrics, ApiError> {
        self.get_json("/api/dashboard/metrics", "metrics").await
    }

    async fn fetch_conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<ConversationMessage>, ApiError> {
        let path = format!("/api/leads/{}/messages", lead_id);
        self.get_json(&path, "messages").await
    }

    async fn update_lead_stage(
        &self,
        lead_id: &LeadId,
        stage_id: &StageId,
    ) -> Result<(), ApiError> {
        self.patch_lead(lead_id, json!({ "stageId": stage_id })).await
    }

    async fn assign_lead(
        &self,
        lead_id: &LeadId,
        assignee: Option<&UserId>,
    ) -> Result<(), ApiError> {
        self.patch_lead(lead_id, json!({ "assignedTo": assignee })).await
    }
}
