//! Annotation log operations

use fclab_common::db::Annotation;
use fclab_common::Result;
use sqlx::{Executor, Sqlite};

/// Append an annotation
///
/// Returns false if the annotator already annotated this image; the log is
/// left untouched in that case.
pub async fn insert_annotation<'e, E>(executor: E, annotation: &Annotation) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO annotations (
            guid, image_id, annotator_id, label, is_calibration, expected_label, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(annotation.id.to_string())
    .bind(annotation.image_id.to_string())
    .bind(&annotation.annotator_id)
    .bind(&annotation.label)
    .bind(annotation.is_calibration)
    .bind(&annotation.expected_label)
    .bind(annotation.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of calibration answers logged for the annotator
pub async fn count_calibrations<'e, E>(executor: E, annotator_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM annotations WHERE annotator_id = ? AND is_calibration = 1",
    )
    .bind(annotator_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Number of annotations of any kind logged for the annotator
pub async fn count_for_annotator<'e, E>(executor: E, annotator_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM annotations WHERE annotator_id = ?")
        .bind(annotator_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}
