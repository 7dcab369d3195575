//! submit-annotation endpoint

use axum::{extract::State, http::StatusCode, Json};

use crate::services::{Submission, SubmissionReceipt};
use crate::{ApiResult, AppState};

/// POST /api/annotations
///
/// 201 when the annotation was recorded, 200 for an acknowledged duplicate.
pub async fn submit_annotation(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> ApiResult<(StatusCode, Json<SubmissionReceipt>)> {
    let receipt = state.recorder.submit(submission).await?;
    let status = if receipt.recorded {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(receipt)))
}
