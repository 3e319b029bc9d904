//! Shared REST state, error mapping and operational endpoints.

use crate::store::{PlanStore, UserStore};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campaign_advisor::{PlanGenerator, ScrapeClient};
use campaign_core::CampaignError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub plans: Arc<PlanStore>,
    pub users: Arc<dyn UserStore>,
    pub generator: Arc<PlanGenerator>,
    pub scraper: Arc<ScrapeClient>,
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map a domain error onto an HTTP status and error code.
pub fn api_error(e: CampaignError) -> ApiError {
    let (status, code) = match &e {
        CampaignError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        CampaignError::NoPlatforms => (StatusCode::BAD_REQUEST, "no_platforms"),
        CampaignError::PlanNotFound(_) => (StatusCode::NOT_FOUND, "plan_not_found"),
        CampaignError::PlacementNotFound(_) => (StatusCode::NOT_FOUND, "placement_not_found"),
        CampaignError::LaunchBlocked { .. } => (StatusCode::CONFLICT, "launch_blocked"),
        CampaignError::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "database_unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status.is_server_error() {
        error!(error = %e, "Request failed");
        metrics::counter!("api.errors").increment(1);
        return error_response(status, code, "Internal processing error");
    }
    error_response(status, code, e.to_string())
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness check.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — Liveness check.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
