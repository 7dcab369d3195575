//! Annotator read models

use axum::{
    extract::{Path, State},
    Json,
};

use crate::services::{AnnotatorDetails, ReliabilityReport};
use crate::{ApiResult, AppState};

/// GET /api/annotators/:id
pub async fn get_reliability(
    State(state): State<AppState>,
    Path(annotator_id): Path<String>,
) -> ApiResult<Json<ReliabilityReport>> {
    Ok(Json(state.tracker.report(&annotator_id).await?))
}

/// GET /api/annotators/:id/details
pub async fn get_annotator_details(
    State(state): State<AppState>,
    Path(annotator_id): Path<String>,
) -> ApiResult<Json<AnnotatorDetails>> {
    Ok(Json(state.tracker.details(&annotator_id).await?))
}
