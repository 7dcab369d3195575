//! Database Test Utilities

use anyhow::Result;
use fclab_ce::db;
use fclab_common::db::{init_database, Image, TruthSource};
use fclab_common::{time, uuid_utils};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Create temporary test database with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = init_database(&temp_dir.path().join("test_fclab.db")).await?;
    Ok((temp_dir, pool))
}

/// Insert an image; `ground_truth` makes it a calibration image
pub async fn add_image(pool: &SqlitePool, filename: &str, ground_truth: Option<&str>) -> Result<Uuid> {
    let image = Image {
        id: uuid_utils::generate(),
        filename: filename.to_string(),
        ground_truth: ground_truth.map(str::to_string),
        truth_source: ground_truth.map(|_| TruthSource::Calibration),
        validated: false,
        annotation_count: 0,
    };
    db::images::insert_image(pool, &image).await?;
    Ok(image.id)
}

/// Create an annotator with `correct` of `attempts` calibration answers right
pub async fn annotator_with_record(
    pool: &SqlitePool,
    annotator_id: &str,
    correct: u32,
    attempts: u32,
) -> Result<()> {
    db::annotators::ensure_annotator(pool, annotator_id).await?;
    for i in 0..attempts {
        db::annotators::record_calibration_outcome(pool, annotator_id, i < correct).await?;
    }
    Ok(())
}

/// Put weight on an image without going through the aggregator
pub async fn seed_vote(
    pool: &SqlitePool,
    image_id: Uuid,
    annotator_id: &str,
    label: &str,
    weight: f64,
) -> Result<()> {
    db::annotators::ensure_annotator(pool, annotator_id).await?;
    db::votes::insert_vote(pool, image_id, annotator_id, label, weight, time::now()).await?;
    Ok(())
}

pub async fn vote_count(pool: &SqlitePool, image_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE image_id = ?")
        .bind(image_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
