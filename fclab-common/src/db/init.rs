//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to date.
//! Every statement is idempotent, so opening an existing database is safe.

use crate::{EngineParams, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// How long a connection waits for the SQLite write lock before failing
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Applied to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_settings_table(&pool).await?;
    create_images_table(&pool).await?;
    create_annotators_table(&pool).await?;
    create_annotations_table(&pool).await?;
    create_votes_table(&pool).await?;
    create_ai_predictions_table(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create the settings table
///
/// Stores engine configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the images table
///
/// `truth_source` is set exactly when `ground_truth` is set: `calibration`
/// truths come from ingestion and are permanent, `consensus` truths are
/// written by the aggregator together with `validated = 1`.
pub async fn create_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            guid TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            ground_truth TEXT,
            truth_source TEXT CHECK (truth_source IS NULL OR truth_source IN ('calibration', 'consensus')),
            validated INTEGER NOT NULL DEFAULT 0,
            annotation_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK ((ground_truth IS NULL) = (truth_source IS NULL)),
            CHECK (annotation_count >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_validated ON images(validated)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_ground_truth ON images(ground_truth)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the annotators table
pub async fn create_annotators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotators (
            annotator_id TEXT PRIMARY KEY,
            calibration_attempts INTEGER NOT NULL DEFAULT 0,
            calibration_correct INTEGER NOT NULL DEFAULT 0,
            reliability REAL NOT NULL DEFAULT 0.0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (calibration_correct >= 0 AND calibration_correct <= calibration_attempts),
            CHECK (reliability >= 0.0 AND reliability <= 1.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the annotations table
///
/// Append-only log. No foreign key on `image_id`: the history survives the
/// removal of an image whose blob went missing, so calibration counts stay
/// consistent with the annotator's reliability.
pub async fn create_annotations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotations (
            guid TEXT PRIMARY KEY,
            image_id TEXT NOT NULL,
            annotator_id TEXT NOT NULL REFERENCES annotators(annotator_id),
            label TEXT NOT NULL,
            is_calibration INTEGER NOT NULL DEFAULT 0,
            expected_label TEXT,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (image_id, annotator_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_annotations_annotator ON annotations(annotator_id, is_calibration)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the votes table
///
/// `id` preserves insertion order, which fixes the summation order used by the
/// aggregator.
pub async fn create_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_id TEXT NOT NULL REFERENCES images(guid) ON DELETE CASCADE,
            annotator_id TEXT NOT NULL REFERENCES annotators(annotator_id),
            label TEXT NOT NULL,
            weight REAL NOT NULL CHECK (weight >= 0.0),
            created_at TIMESTAMP NOT NULL,
            UNIQUE (image_id, annotator_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_image ON votes(image_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the AI predictions table
///
/// A NULL `predicted_label` records that the predictor produced nothing.
pub async fn create_ai_predictions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_predictions (
            image_id TEXT PRIMARY KEY REFERENCES images(guid) ON DELETE CASCADE,
            predicted_label TEXT,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures every engine parameter exists, resetting NULL values to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for meta in EngineParams::metadata() {
        ensure_setting(pool, meta.key, meta.default_value).await?;
    }

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE tolerates concurrent initialization
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query(
        "UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ? AND value IS NULL",
    )
    .bind(default_value)
    .bind(key)
    .execute(pool)
    .await?
    .rows_affected();

    if reset > 0 {
        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Write a setting value (upsert)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
