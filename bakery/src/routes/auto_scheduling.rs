use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ApiError;
use crate::auth::CurrentUser;
use crate::core::handlers::{get_all_handler, get_one_handler};
use crate::entities::scheduling_draft::{DraftModification, DraftOperations, DraftSuggestion, SchedulingDraft};
use crate::extract::{Json, Path};
use crate::scheduling::{self, BulkApproveOutcome, DraftStats, IngestOutcome};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/drafts", get(get_all_handler::<DraftOperations>).post(ingest))
        .route("/drafts/bulk-approve", post(bulk_approve))
        .route("/drafts/{id}", get(get_one_handler::<DraftOperations>))
        .route("/drafts/{id}/approve", post(approve))
        .route("/drafts/{id}/reject", post(reject))
        .route("/drafts/{id}/modify", post(modify))
        .route("/generate", post(generate))
        .route("/stats", get(stats))
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct SuggestionBatch {
    pub suggestions: Vec<DraftSuggestion>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct GenerateRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct Rejection {
    pub reason: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default)]
pub struct BulkApproveRequest {
    pub ids: Option<Vec<Uuid>>,
    pub min_confidence: Option<f64>,
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/drafts",
    request_body = SuggestionBatch,
    responses(
        (status = 201, description = "Drafts created", body = IngestOutcome),
        (status = 400, description = "Invalid suggestion, closed order or unusable distributor")
    ),
    tag = "auto-scheduling"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(batch): Json<SuggestionBatch>,
) -> Result<(StatusCode, Json<IngestOutcome>), ApiError> {
    let outcome = scheduling::ingest(&state.db, batch.suggestions).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Suggestions fetched and stored", body = IngestOutcome),
        (status = 503, description = "Scoring service not configured or unreachable")
    ),
    tag = "auto-scheduling"
)]
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<IngestOutcome>, ApiError> {
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let outcome = scheduling::generate(&state.db, state.scheduler.as_deref(), date).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/drafts/{id}/approve",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft approved and order assigned", body = SchedulingDraft),
        (status = 400, description = "Already reviewed"),
        (status = 409, description = "Distributor fully booked")
    ),
    tag = "auto-scheduling"
)]
pub async fn approve(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SchedulingDraft>, ApiError> {
    Ok(Json(scheduling::approve(&state.db, id, caller.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/drafts/{id}/reject",
    params(("id" = Uuid, Path, description = "Draft id")),
    request_body = Rejection,
    responses(
        (status = 200, description = "Draft rejected", body = SchedulingDraft),
        (status = 400, description = "Missing reason or already reviewed")
    ),
    tag = "auto-scheduling"
)]
pub async fn reject(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(rejection): Json<Rejection>,
) -> Result<Json<SchedulingDraft>, ApiError> {
    Ok(Json(scheduling::reject(&state.db, id, caller.id, &rejection.reason).await?))
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/drafts/{id}/modify",
    params(("id" = Uuid, Path, description = "Draft id")),
    request_body = DraftModification,
    responses(
        (status = 200, description = "Alternative applied", body = SchedulingDraft),
        (status = 400, description = "Already reviewed"),
        (status = 409, description = "Distributor fully booked")
    ),
    tag = "auto-scheduling"
)]
pub async fn modify(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(modification): Json<DraftModification>,
) -> Result<Json<SchedulingDraft>, ApiError> {
    Ok(Json(scheduling::modify(&state.db, id, caller.id, modification).await?))
}

#[utoipa::path(
    post,
    path = "/api/auto-scheduling/drafts/bulk-approve",
    request_body = BulkApproveRequest,
    responses((status = 200, description = "Per-draft outcome", body = BulkApproveOutcome)),
    tag = "auto-scheduling"
)]
pub async fn bulk_approve(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(request): Json<BulkApproveRequest>,
) -> Result<Json<BulkApproveOutcome>, ApiError> {
    let outcome = scheduling::bulk_approve(&state.db, request.ids, request.min_confidence, caller.id).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/auto-scheduling/stats",
    responses((status = 200, description = "Review statistics", body = DraftStats)),
    tag = "auto-scheduling"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<DraftStats>, ApiError> {
    Ok(Json(scheduling::stats(&state.db).await?))
}
