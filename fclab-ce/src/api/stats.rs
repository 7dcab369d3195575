//! Pool statistics endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::api::tasks::AnnotatorQuery;
use crate::db::predictions::{prediction_stats, PredictionStats};
use crate::db::stats::{pool_summary, PoolSummary};
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    pub annotator_id: String,
    pub remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct PredictionStatsResponse {
    #[serde(flatten)]
    pub stats: PredictionStats,
    pub accuracy: f64,
}

/// GET /api/stats/remaining?annotator_id=
pub async fn get_remaining(
    State(state): State<AppState>,
    Query(query): Query<AnnotatorQuery>,
) -> ApiResult<Json<RemainingResponse>> {
    let remaining = state.dispatcher.remaining_for(&query.annotator_id).await?;

    Ok(Json(RemainingResponse {
        annotator_id: query.annotator_id,
        remaining,
    }))
}

/// GET /api/stats/summary
pub async fn get_pool_summary(State(state): State<AppState>) -> ApiResult<Json<PoolSummary>> {
    Ok(Json(pool_summary(&state.db).await?))
}

/// GET /api/stats/predictions
pub async fn get_prediction_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<PredictionStatsResponse>> {
    let stats = prediction_stats(&state.db).await?;

    Ok(Json(PredictionStatsResponse {
        accuracy: stats.accuracy(),
        stats,
    }))
}
