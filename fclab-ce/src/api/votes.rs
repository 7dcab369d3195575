//! cast-vote endpoint

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::ConsensusOutcome;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub image_id: Uuid,
    pub annotator_id: String,
    pub label: String,
}

/// POST /api/votes
pub async fn cast_vote(
    State(state): State<AppState>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<ConsensusOutcome>> {
    let outcome = state
        .aggregator
        .cast_vote(request.image_id, &request.annotator_id, &request.label)
        .await?;

    Ok(Json(outcome))
}
