//! Plant trigger endpoints.
//!
//! Writes are never performed here: creation and fertilizing are handed to
//! the durable scheduler and acknowledged with `202 Accepted`. Whatever
//! happens when the job later runs is only visible in the logs.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sprout_core::PlantId;
use sprout_garden::{
    schedule::{request_fertilizer, request_plant},
    GardenError, Plant, PlantStore,
};
use tracing::error;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct PlantSeedRequest {
    pub plant_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub job_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: GardenError) -> ApiError {
    error!(code = e.code(), "request failed: {e}");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
}

/// POST /api/plants — enqueue planting a new seed.
pub async fn plant_seed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlantSeedRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let job_id = request_plant(&state.scheduler, &req.plant_type).map_err(api_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: format!(
                "Job '{job_id}' is enqueued. A new '{}' will be planted.",
                req.plant_type
            ),
            job_id,
        }),
    ))
}

/// POST /api/plants/{id}/fertilize — schedule the delayed fertilizer effect.
pub async fn fertilize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PlantId>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let care = &state.config.care;
    let job_id = request_fertilizer(&state.scheduler, id, care).map_err(api_error)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: format!(
                "Job '{job_id}' is scheduled. Plant {id} will be fertilized in {}s.",
                care.fertilizer_delay_secs
            ),
            job_id,
        }),
    ))
}

/// GET /api/plants — direct store read.
pub async fn list_plants(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Plant>>, ApiError> {
    state.store.list_all().map(Json).map_err(api_error)
}
