//! AI prediction records
//!
//! Predictions are comparison data only. Nothing here is read by the consensus
//! path.

use chrono::{DateTime, Utc};
use fclab_common::Result;
use serde::Serialize;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

/// Whether a prediction (possibly empty) is already stored for the image
pub async fn has_prediction<'e, E>(executor: E, image_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ai_predictions WHERE image_id = ?)")
            .bind(image_id.to_string())
            .fetch_one(executor)
            .await?;

    Ok(exists)
}

/// Store the prediction for an image; the first stored prediction wins
pub async fn insert_prediction<'e, E>(
    executor: E,
    image_id: Uuid,
    predicted_label: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO ai_predictions (image_id, predicted_label, created_at) VALUES (?, ?, ?)",
    )
    .bind(image_id.to_string())
    .bind(predicted_label)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Agreement between stored predictions and current ground truth
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PredictionStats {
    /// Images the predictor was consulted for
    pub predictions: i64,
    /// Predictions that produced a label
    pub with_prediction: i64,
    /// Labelled predictions equal to the image's ground truth
    pub matching_ground_truth: i64,
}

impl PredictionStats {
    /// matching / with_prediction, 0 when there is nothing to compare
    pub fn accuracy(&self) -> f64 {
        if self.with_prediction == 0 {
            0.0
        } else {
            self.matching_ground_truth as f64 / self.with_prediction as f64
        }
    }
}

pub async fn prediction_stats<'e, E>(executor: E) -> Result<PredictionStats>
where
    E: Executor<'e, Database = Sqlite>,
{
    let stats: PredictionStats = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS predictions,
            COUNT(p.predicted_label) AS with_prediction,
            COALESCE(SUM(CASE WHEN p.predicted_label = i.ground_truth THEN 1 ELSE 0 END), 0)
                AS matching_ground_truth
        FROM ai_predictions p
        JOIN images i ON i.guid = p.image_id
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(stats)
}
