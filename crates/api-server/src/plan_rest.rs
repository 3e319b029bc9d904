//! Media plan REST endpoints: generation, manual edits, IO status, launch
//! gate and exports.

use crate::rest::{api_error, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use campaign_core::types::{CampaignData, IoStatus, MediaPlan, Placement, PlacementInput};
use campaign_media_plan::{editor, export, forecast, io, LaunchManifest, PlanForecast};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct IoStatusRequest {
    pub status: IoStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    #[serde(default)]
    pub bypass_draft: bool,
}

/// POST /api/v1/media-plans — Generate a plan from campaign data.
pub async fn create_plan(
    State(state): State<AppState>,
    Json(data): Json<CampaignData>,
) -> ApiResult<(StatusCode, Json<MediaPlan>)> {
    let plan = state
        .generator
        .allocator()
        .generate_plan(&data, None)
        .map_err(api_error)?;
    info!(
        plan_id = %plan.id,
        io_number = %plan.io_number,
        placements = plan.placements.len(),
        "Media plan created"
    );
    metrics::counter!("api.media_plans.created").increment(1);
    Ok((StatusCode::CREATED, Json(state.plans.insert(plan, Some(data)))))
}

/// GET /api/v1/media-plans
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<MediaPlan>> {
    Json(state.plans.list())
}

/// GET /api/v1/media-plans/:id
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MediaPlan>> {
    state.plans.get(id).map(Json).map_err(api_error)
}

/// DELETE /api/v1/media-plans/:id
pub async fn delete_plan(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.plans.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/v1/media-plans/:id/regenerate — Rebuild every placement,
/// keeping the plan id and IO number.
pub async fn regenerate_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<CampaignData>,
) -> ApiResult<Json<MediaPlan>> {
    let existing = state.plans.get(id).map_err(api_error)?;
    let plan = state
        .generator
        .allocator()
        .generate_plan(&data, Some(&existing.io_number))
        .map_err(api_error)?;
    state.plans.replace(id, plan, data).map(Json).map_err(api_error)
}

/// POST /api/v1/media-plans/:id/placements
pub async fn add_placement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PlacementInput>,
) -> ApiResult<(StatusCode, Json<Placement>)> {
    let placement = state
        .plans
        .update(id, |plan| editor::add_placement(plan, input))
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(placement)))
}

/// PUT /api/v1/media-plans/:id/placements/:placement_id
pub async fn update_placement(
    State(state): State<AppState>,
    Path((id, placement_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<PlacementInput>,
) -> ApiResult<Json<Placement>> {
    state
        .plans
        .update(id, |plan| editor::update_placement(plan, placement_id, input))
        .map(Json)
        .map_err(api_error)
}

/// DELETE /api/v1/media-plans/:id/placements/:placement_id
pub async fn delete_placement(
    State(state): State<AppState>,
    Path((id, placement_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .plans
        .update(id, |plan| editor::remove_placement(plan, placement_id))
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/media-plans/:id/io-status
pub async fn set_io_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<IoStatusRequest>,
) -> ApiResult<Json<MediaPlan>> {
    state
        .plans
        .update(id, |plan| {
            io::set_io_status(plan, req.status);
            Ok(plan.clone())
        })
        .map(Json)
        .map_err(api_error)
}

/// POST /api/v1/media-plans/:id/launch — Draft IOs are refused unless
/// `bypassDraft` is set.
pub async fn launch_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LaunchRequest>,
) -> ApiResult<Json<LaunchManifest>> {
    let plan = state.plans.get(id).map_err(api_error)?;
    io::launch(&plan, req.bypass_draft).map(Json).map_err(api_error)
}

/// GET /api/v1/media-plans/:id/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let plan = state.plans.get(id).map_err(api_error)?;
    let csv = export::export_csv(&plan.placements).map_err(api_error)?;
    metrics::counter!("api.media_plans.exports", "format" => "csv").increment(1);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"media-plan-{}.csv\"", plan.io_number),
            ),
        ],
        csv,
    ))
}

/// GET /api/v1/media-plans/:id/io-document
pub async fn io_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let plan = state.plans.get(id).map_err(api_error)?;
    let advertiser = state
        .plans
        .campaign(id)
        .map_err(api_error)?
        .map(|c| c.website_url)
        .unwrap_or_default();
    metrics::counter!("api.media_plans.exports", "format" => "io").increment(1);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        export::io_document(&plan, &advertiser),
    ))
}

/// GET /api/v1/media-plans/:id/forecast
pub async fn plan_forecast(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlanForecast>> {
    let plan = state.plans.get(id).map_err(api_error)?;
    Ok(Json(forecast::forecast(
        &plan,
        state.generator.allocator().tables(),
    )))
}
