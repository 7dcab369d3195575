//! Annotator operations

use fclab_common::db::Annotator;
use fclab_common::Result;
use sqlx::{Executor, Sqlite};

#[derive(sqlx::FromRow)]
struct AnnotatorRow {
    annotator_id: String,
    calibration_attempts: i64,
    calibration_correct: i64,
    reliability: f64,
}

impl From<AnnotatorRow> for Annotator {
    fn from(row: AnnotatorRow) -> Self {
        Annotator {
            annotator_id: row.annotator_id,
            calibration_attempts: row.calibration_attempts,
            calibration_correct: row.calibration_correct,
            reliability: row.reliability,
        }
    }
}

/// Create the annotator with zero calibration history if it does not exist
pub async fn ensure_annotator<'e, E>(executor: E, annotator_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO annotators (annotator_id) VALUES (?)")
        .bind(annotator_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Load an annotator by id
pub async fn get_annotator<'e, E>(executor: E, annotator_id: &str) -> Result<Option<Annotator>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<AnnotatorRow> = sqlx::query_as(
        r#"
        SELECT annotator_id, calibration_attempts, calibration_correct, reliability
        FROM annotators
        WHERE annotator_id = ?
        "#,
    )
    .bind(annotator_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Annotator::from))
}

/// Accumulate one calibration outcome and return the updated annotator
///
/// Single UPSERT statement: the read-modify-write of attempts/correct happens
/// inside SQLite, so concurrent outcomes for one annotator never lose updates.
/// Every SET expression reads the pre-update row.
pub async fn record_calibration_outcome<'e, E>(
    executor: E,
    annotator_id: &str,
    was_correct: bool,
) -> Result<Annotator>
where
    E: Executor<'e, Database = Sqlite>,
{
    let correct_increment: i64 = if was_correct { 1 } else { 0 };

    let row: AnnotatorRow = sqlx::query_as(
        r#"
        INSERT INTO annotators (annotator_id, calibration_attempts, calibration_correct, reliability)
        VALUES (?, 1, ?, ?)
        ON CONFLICT(annotator_id) DO UPDATE SET
            calibration_attempts = calibration_attempts + 1,
            calibration_correct = calibration_correct + excluded.calibration_correct,
            reliability = CAST(calibration_correct + excluded.calibration_correct AS REAL)
                          / (calibration_attempts + 1),
            updated_at = CURRENT_TIMESTAMP
        RETURNING annotator_id, calibration_attempts, calibration_correct, reliability
        "#,
    )
    .bind(annotator_id)
    .bind(correct_increment)
    .bind(correct_increment as f64)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}
