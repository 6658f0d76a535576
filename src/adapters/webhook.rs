use crate::core::recalculator::{EstimateRecalculator, RecalculationSettings};
use crate::core::{RecalculationReport, TrackerConnector};
use crate::domain::model::ServiceHookEvent;
use crate::utils::error::EstimatorError;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SUCCESS_MESSAGE: &str = "Event processed and recalculation completed";

pub struct AppState<C: TrackerConnector> {
    pub connector: C,
    pub settings: RecalculationSettings,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub message: String,
    pub report: RecalculationReport,
}

impl IntoResponse for EventResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    detail: String,
}

/// Errors returned to the webhook caller.
#[derive(Debug)]
pub enum WebhookError {
    Unauthorized(String),
    Internal(EstimatorError),
}

impl From<EstimatorError> for WebhookError {
    fn from(err: EstimatorError) -> Self {
        match err {
            EstimatorError::Unauthorized { message } => WebhookError::Unauthorized(message),
            other => WebhookError::Internal(other),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            WebhookError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            WebhookError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        (status, Json(ApiErrorResponse { detail })).into_response()
    }
}

/// Returns the token carried by an `Authorization` header value.
///
/// `Bearer <token>` yields `<token>`; any other value is taken as the token itself.
pub fn extract_token(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let token = match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

pub fn router<C>(state: Arc<AppState<C>>) -> Router
where
    C: TrackerConnector + 'static,
{
    Router::new()
        .route("/", post(handle_event::<C>))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve<C>(listener: TcpListener, state: Arc<AppState<C>>) -> std::io::Result<()>
where
    C: TrackerConnector + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🚀 Listening for service hook events on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutting down");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_event<C>(
    State(state): State<Arc<AppState<C>>>,
    headers: HeaderMap,
    Json(event): Json<ServiceHookEvent>,
) -> Result<EventResponse, WebhookError>
where
    C: TrackerConnector + 'static,
{
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::Unauthorized("missing Authorization header".to_string()))?;
    tracing::debug!(
        "Authorization header received (bearer scheme: {})",
        header.trim_start().starts_with("Bearer ")
    );
    let token = extract_token(header)
        .ok_or_else(|| WebhookError::Unauthorized("empty access token".to_string()))?;

    log_event(&event);

    let tracker = state.connector.connect(token)?;
    let recalculator = EstimateRecalculator::new(tracker, state.settings.clone());

    let report = recalculator.run().await.map_err(|e| {
        tracing::error!("❌ Recalculation failed: {}", e);
        WebhookError::from(e)
    })?;

    tracing::info!(
        "✅ Event {} processed: {} updated, {} skipped, {} failed",
        event.id,
        report.updated_count(),
        report.skipped_count(),
        report.failed_count()
    );

    Ok(EventResponse {
        message: SUCCESS_MESSAGE.to_string(),
        report,
    })
}

fn log_event(event: &ServiceHookEvent) {
    let resource = &event.resource;
    tracing::info!("📥 Processing event: {}", event.event_type);
    match event.created_at() {
        Some(created_at) => tracing::debug!("Event {} created at {}", event.id, created_at),
        None => tracing::debug!("Event {} has unparsed createdDate {:?}", event.id, event.created_date),
    }
    tracing::info!(
        "Resource id: {}, status: {}",
        resource.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        resource.status.as_deref().unwrap_or("-")
    );

    if let Some(build_number) = resource.build_number.as_deref() {
        if resource.build_succeeded() {
            tracing::info!("Build {} succeeded", build_number);
        } else {
            tracing::warn!("Build {} did not succeed", build_number);
        }
    }
}
