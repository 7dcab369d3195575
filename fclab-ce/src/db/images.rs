//! Image pool operations

use fclab_common::db::{Image, TruthSource};
use fclab_common::uuid_utils::parse_stored;
use fclab_common::{Error, Result};
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ImageRow {
    guid: String,
    filename: String,
    ground_truth: Option<String>,
    truth_source: Option<String>,
    validated: bool,
    annotation_count: i64,
}

impl ImageRow {
    fn into_image(self) -> Result<Image> {
        let truth_source = match self.truth_source.as_deref() {
            Some(s) => Some(TruthSource::parse(s).ok_or_else(|| {
                Error::Internal(format!("Unknown truth_source '{}' on image {}", s, self.guid))
            })?),
            None => None,
        };

        Ok(Image {
            id: parse_stored(&self.guid)?,
            filename: self.filename,
            ground_truth: self.ground_truth,
            truth_source,
            validated: self.validated,
            annotation_count: self.annotation_count,
        })
    }
}

/// Insert a new image into the pool
pub async fn insert_image<'e, E>(executor: E, image: &Image) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO images (guid, filename, ground_truth, truth_source, validated, annotation_count)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(image.id.to_string())
    .bind(&image.filename)
    .bind(&image.ground_truth)
    .bind(image.truth_source.map(|s| s.as_str()))
    .bind(image.validated)
    .bind(image.annotation_count)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load an image by id
pub async fn get_image<'e, E>(executor: E, image_id: Uuid) -> Result<Option<Image>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<ImageRow> = sqlx::query_as(
        r#"
        SELECT guid, filename, ground_truth, truth_source, validated, annotation_count
        FROM images
        WHERE guid = ?
        "#,
    )
    .bind(image_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.map(ImageRow::into_image).transpose()
}

/// Images carrying a ground truth that the annotator has not annotated yet
///
/// Both calibration answers and consensus-validated labels qualify.
pub async fn calibration_candidates<'e, E>(executor: E, annotator_id: &str) -> Result<Vec<Uuid>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let guids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM images
        WHERE ground_truth IS NOT NULL
          AND guid NOT IN (SELECT image_id FROM annotations WHERE annotator_id = ?)
        ORDER BY guid
        "#,
    )
    .bind(annotator_id)
    .fetch_all(executor)
    .await?;

    guids.iter().map(|g| parse_stored(g)).collect()
}

/// Unvalidated images that the annotator has not annotated yet
pub async fn unvalidated_candidates<'e, E>(executor: E, annotator_id: &str) -> Result<Vec<Uuid>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let guids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT guid FROM images
        WHERE validated = 0
          AND guid NOT IN (SELECT image_id FROM annotations WHERE annotator_id = ?)
        ORDER BY guid
        "#,
    )
    .bind(annotator_id)
    .fetch_all(executor)
    .await?;

    guids.iter().map(|g| parse_stored(g)).collect()
}

/// Count unvalidated images that the annotator has not annotated yet
pub async fn count_unvalidated_unseen<'e, E>(executor: E, annotator_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM images
        WHERE validated = 0
          AND guid NOT IN (SELECT image_id FROM annotations WHERE annotator_id = ?)
        "#,
    )
    .bind(annotator_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Freeze a consensus label on the image
///
/// No-op for validated images and for images holding a calibration truth.
/// Returns true if the image was updated.
pub async fn validate_with_consensus<'e, E>(executor: E, image_id: Uuid, label: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE images
        SET ground_truth = ?, truth_source = 'consensus', validated = 1, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
          AND validated = 0
          AND (truth_source IS NULL OR truth_source = 'consensus')
        "#,
    )
    .bind(label)
    .bind(image_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Clear a revocable consensus label
///
/// Leaves `validated = 0`. No-op for validated images and for calibration
/// truths. Returns true if the image was updated.
pub async fn clear_consensus_truth<'e, E>(executor: E, image_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE images
        SET ground_truth = NULL, truth_source = NULL, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
          AND validated = 0
          AND truth_source = 'consensus'
        "#,
    )
    .bind(image_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Increment the monotonic annotation counter
pub async fn increment_annotation_count<'e, E>(executor: E, image_id: Uuid) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE images SET annotation_count = annotation_count + 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(image_id.to_string())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::ImageNotFound(image_id));
    }

    Ok(())
}

/// Remove an image from the pool (votes and predictions cascade)
pub async fn delete_image<'e, E>(executor: E, image_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM images WHERE guid = ?")
        .bind(image_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
