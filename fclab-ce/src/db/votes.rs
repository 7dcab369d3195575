//! Vote log operations

use chrono::{DateTime, Utc};
use fclab_common::Result;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

/// Append a vote
///
/// Returns false if the annotator already voted on this image; no weight is
/// added in that case.
pub async fn insert_vote<'e, E>(
    executor: E,
    image_id: Uuid,
    annotator_id: &str,
    label: &str,
    weight: f64,
    created_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO votes (image_id, annotator_id, label, weight, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(image_id.to_string())
    .bind(annotator_id)
    .bind(label)
    .bind(weight)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All `(label, weight)` pairs for an image in insertion order
pub async fn weights_for_image<'e, E>(executor: E, image_id: Uuid) -> Result<Vec<(String, f64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, f64)> =
        sqlx::query_as("SELECT label, weight FROM votes WHERE image_id = ? ORDER BY id")
            .bind(image_id.to_string())
            .fetch_all(executor)
            .await?;

    Ok(rows)
}

/// Number of votes cast by an annotator
pub async fn count_for_annotator<'e, E>(executor: E, annotator_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE annotator_id = ?")
        .bind(annotator_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}
