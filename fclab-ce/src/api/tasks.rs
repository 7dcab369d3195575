//! request-a-task endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AnnotatorQuery {
    pub annotator_id: String,
}

/// Task response; `expected_label` is present only for calibration images
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub image_id: Uuid,
    /// Base64-encoded image bytes
    pub image: String,
    pub is_calibration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_label: Option<String>,
}

/// GET /api/task?annotator_id=
pub async fn request_task(
    State(state): State<AppState>,
    Query(query): Query<AnnotatorQuery>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.dispatcher.request_task(&query.annotator_id).await?;

    Ok(Json(TaskResponse {
        image_id: task.image_id,
        image: STANDARD.encode(&task.image_bytes),
        is_calibration: task.is_calibration,
        expected_label: task.expected_label,
    }))
}
