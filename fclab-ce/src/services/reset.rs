//! Pool reset
//!
//! Empties the labeling pool: every image, annotation, vote, prediction and
//! annotator row, then every stored blob. Engine settings are kept.

use crate::services::blob_store::BlobStore;
use fclab_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

/// Rows and blobs removed by a reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub images: u64,
    pub annotations: u64,
    pub votes: u64,
    pub predictions: u64,
    pub annotators: u64,
    pub blobs: usize,
}

/// Delete all pool data and blobs
///
/// Rows go in one transaction, children before parents. Blobs are cleared
/// after the commit so a failed reset never leaves rows without bytes.
pub async fn reset_pool(db: &SqlitePool, blobs: &dyn BlobStore) -> Result<ResetSummary> {
    let mut tx = db.begin().await?;

    let votes = sqlx::query("DELETE FROM votes")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let predictions = sqlx::query("DELETE FROM ai_predictions")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let annotations = sqlx::query("DELETE FROM annotations")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let images = sqlx::query("DELETE FROM images")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let annotators = sqlx::query("DELETE FROM annotators")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    let summary = ResetSummary {
        images,
        annotations,
        votes,
        predictions,
        annotators,
        blobs: blobs.clear().await?,
    };

    info!(
        images = summary.images,
        annotations = summary.annotations,
        votes = summary.votes,
        predictions = summary.predictions,
        annotators = summary.annotators,
        blobs = summary.blobs,
        "Pool reset"
    );

    Ok(summary)
}
