use std::process::ExitCode;
use std::sync::Arc;

use pipeline_sync::adapters::{ChannelEndpoints, CookieTokenSource, HttpPipelineApi, LiveConnector};
use pipeline_sync::application::RealtimeSession;
use pipeline_sync::config::AppConfig;
use pipeline_sync::domain::foundation::{DomainError, UserId};
use pipeline_sync::ports::TokenSource;
use pipeline_sync::telemetry::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code, error = %e, "pipeline sync stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), DomainError> {
    let endpoint = &config.endpoint;
    let user_id = UserId::new(endpoint.user_id.trim())?;
    let endpoints = ChannelEndpoints::new(
        &endpoint.base_url,
        endpoint.socket_path.clone(),
        endpoint.stream_path.clone(),
        user_id,
    )?;
    let tokens: Arc<dyn TokenSource> = Arc::new(CookieTokenSource::new(
        endpoint.auth_cookie_name.clone(),
        endpoint.cookie_header(),
    ));

    let connector = LiveConnector::new(
        endpoints.clone(),
        Arc::clone(&tokens),
        endpoint.request_timeout(),
    )?;
    let settings = config.session_settings(connector.environment(endpoint.socket_enabled));
    let api = HttpPipelineApi::new(endpoints, tokens, endpoint.request_timeout())?;

    let session = RealtimeSession::new(Arc::new(api), Arc::new(connector), settings);
    let mut changes = session.store().subscribe();
    let mut status = session.connection().watch();

    session.start().await?;
    tracing::info!(base_url = %endpoint.base_url, "pipeline sync started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                tracing::info!(
                    leads = state.leads().len(),
                    stages = state.stages().len(),
                    selected = ?state.selected_lead_id(),
                    "store updated"
                );
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!(status = %current, "connection status");
            }
        }
    }

    session.shutdown();
    Ok(())
}
