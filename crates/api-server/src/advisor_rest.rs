//! AI-assisted endpoints: plan generation with fallback, personas and
//! website scraping.

use crate::rest::{api_error, error_response, ApiResult, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campaign_advisor::{AdvisorError, GeneratedPlan, PersonaRequest, PlanSource};
use campaign_core::types::{AudiencePersona, CampaignData};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PersonasResponse {
    pub personas: Vec<AudiencePersona>,
    pub source: PlanSource,
}

/// POST /api/generate-plan — Advisor-backed plan; falls back to the
/// deterministic split when the advisor fails.
pub async fn generate_plan(
    State(state): State<AppState>,
    Json(data): Json<CampaignData>,
) -> ApiResult<Json<GeneratedPlan>> {
    let generated = state.generator.generate(&data, None).await.map_err(api_error)?;
    state.plans.insert(generated.plan.clone(), Some(data));
    Ok(Json(generated))
}

/// POST /api/personas
pub async fn generate_personas(
    State(state): State<AppState>,
    Json(request): Json<PersonaRequest>,
) -> Json<PersonasResponse> {
    let (personas, source) = state.generator.personas(&request).await;
    Json(PersonasResponse { personas, source })
}

/// POST /api/scrape — `{url}` → `{content}`.
pub async fn scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Json<ScrapeResponse>> {
    match state.scraper.fetch_text(&request.url).await {
        Ok(content) => Ok(Json(ScrapeResponse { content })),
        Err(AdvisorError::InvalidUrl(msg)) => {
            Err(error_response(StatusCode::BAD_REQUEST, "invalid_url", msg))
        }
        Err(e) => {
            warn!(error = %e, url = %request.url, "Scrape failed");
            metrics::counter!("api.scrape_failures").increment(1);
            Err(error_response(
                StatusCode::BAD_GATEWAY,
                "scrape_failed",
                "Failed to fetch website content",
            ))
        }
    }
}
