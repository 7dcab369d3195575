//! Task dispatch
//!
//! request-a-task end to end: register the annotator, sample an image, load its
//! bytes and, for calibration images, consult the species predictor once.

use crate::db;
use crate::services::blob_store::BlobStore;
use crate::services::predictor::SpeciesPredictor;
use crate::services::task_sampler::{SampledTask, TaskSampler};
use fclab_common::{time, Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Image handed to an annotator
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub image_id: Uuid,
    pub image_bytes: Vec<u8>,
    pub is_calibration: bool,
    pub expected_label: Option<String>,
}

pub struct TaskDispatcher {
    db: SqlitePool,
    sampler: TaskSampler,
    blobs: Arc<dyn BlobStore>,
    predictor: Arc<dyn SpeciesPredictor>,
}

impl TaskDispatcher {
    pub fn new(
        db: SqlitePool,
        sampler: TaskSampler,
        blobs: Arc<dyn BlobStore>,
        predictor: Arc<dyn SpeciesPredictor>,
    ) -> Self {
        Self {
            db,
            sampler,
            blobs,
            predictor,
        }
    }

    /// request-a-task
    ///
    /// A missing blob removes the image from the pool and is reported to the
    /// caller; there is no retry with another image.
    pub async fn request_task(&self, annotator_id: &str) -> Result<Task> {
        let annotator_id = annotator_id.trim();
        if annotator_id.is_empty() {
            return Err(Error::InvalidInput("annotator_id cannot be empty".to_string()));
        }

        db::annotators::ensure_annotator(&self.db, annotator_id).await?;

        let SampledTask {
            image,
            is_calibration,
            expected_label,
        } = self.sampler.next_task(annotator_id).await?;

        let image_bytes = match self.blobs.fetch(image.id).await {
            Ok(bytes) => bytes,
            Err(Error::BlobMissing(image_id)) => {
                let removed = db::images::delete_image(&self.db, image_id).await?;
                warn!(
                    %image_id,
                    filename = %image.filename,
                    removed,
                    "Image bytes missing, removed image from pool"
                );
                return Err(Error::BlobMissing(image_id));
            }
            Err(e) => return Err(e),
        };

        if is_calibration {
            if let Err(e) = self.record_prediction(image.id, &image_bytes).await {
                warn!(image_id = %image.id, error = %e, "Failed to record AI prediction");
            }
        }

        debug!(
            annotator_id,
            image_id = %image.id,
            is_calibration,
            "Task dispatched"
        );

        Ok(Task {
            image_id: image.id,
            image_bytes,
            is_calibration,
            expected_label,
        })
    }

    /// get-remaining-count
    pub async fn remaining_for(&self, annotator_id: &str) -> Result<i64> {
        db::images::count_unvalidated_unseen(&self.db, annotator_id).await
    }

    /// Store the predictor's answer the first time an image is served as calibration
    async fn record_prediction(&self, image_id: Uuid, image_bytes: &[u8]) -> Result<()> {
        if db::predictions::has_prediction(&self.db, image_id).await? {
            return Ok(());
        }

        let predicted = match self.predictor.predict(image_bytes).await {
            Ok(label) => label,
            Err(e) => {
                warn!(
                    %image_id,
                    predictor = self.predictor.name(),
                    error = %e,
                    "Prediction failed, recording no prediction"
                );
                None
            }
        };

        db::predictions::insert_prediction(&self.db, image_id, predicted.as_deref(), time::now())
            .await?;

        debug!(
            %image_id,
            predictor = self.predictor.name(),
            predicted = ?predicted,
            "AI prediction recorded"
        );

        Ok(())
    }
}
