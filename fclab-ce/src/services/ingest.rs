//! Folder ingestion
//!
//! Registers every image file directly inside a folder: bytes go to the blob
//! store, a row goes to the pool. Files named after a known species code
//! (`ABL_0042.jpg`) become calibration images.

use crate::db;
use crate::services::blob_store::BlobStore;
use fclab_common::db::{Image, TruthSource};
use fclab_common::labels::{is_image_file, label_from_filename};
use fclab_common::{uuid_utils, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Totals for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub ingested: usize,
    /// Ingested images that carry a calibration ground truth
    pub calibration: usize,
    /// Non-image or unreadable files
    pub skipped: usize,
}

/// Ingest the images of `folder` (non-recursive, sorted by file name)
pub async fn ingest_folder(
    db: &SqlitePool,
    blobs: &dyn BlobStore,
    folder: &Path,
) -> Result<IngestSummary> {
    if !folder.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Not a directory: {}",
            folder.display()
        )));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let mut summary = IngestSummary::default();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Error accessing entry");
                summary.skipped += 1;
            }
        }
    }

    for path in files {
        if !is_image_file(&path) {
            debug!(path = %path.display(), "Skipping non-image file");
            summary.skipped += 1;
            continue;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read image");
                summary.skipped += 1;
                continue;
            }
        };

        let ground_truth = label_from_filename(&path);
        let image = Image {
            id: uuid_utils::generate(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            truth_source: ground_truth.as_ref().map(|_| TruthSource::Calibration),
            ground_truth,
            validated: false,
            annotation_count: 0,
        };

        // Bytes first: a pool row never points at a blob that was not written
        blobs.store(image.id, &bytes).await?;
        db::images::insert_image(db, &image).await?;

        summary.ingested += 1;
        if image.ground_truth.is_some() {
            summary.calibration += 1;
        }
        debug!(
            image_id = %image.id,
            filename = %image.filename,
            ground_truth = ?image.ground_truth,
            "Image ingested"
        );
    }

    info!(
        folder = %folder.display(),
        ingested = summary.ingested,
        calibration = summary.calibration,
        skipped = summary.skipped,
        "Ingestion complete"
    );

    Ok(summary)
}
