//! Annotation Recorder
//!
//! Side effects of one submission, committed together in a single transaction:
//! 1. append the annotation
//! 2. calibration answers: update the annotator's reliability
//! 3. increment the image's annotation counter
//!
//! The recorder never touches `ground_truth`/`validated`; consensus is the
//! aggregator's job and is invoked separately for normal submissions.

use crate::db;
use crate::services::reliability_tracker::ReliabilityTracker;
use fclab_common::db::Annotation;
use fclab_common::labels::normalize_label;
use fclab_common::{time, uuid_utils, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// One submit-annotation request
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub image_id: Uuid,
    pub annotator_id: String,
    pub label: String,
    #[serde(default)]
    pub is_calibration: bool,
    #[serde(default)]
    pub expected_label: Option<String>,
}

/// Acknowledgement for a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    /// False when the annotator had already annotated this image
    pub recorded: bool,
    /// Updated reliability, for recorded calibration answers only
    pub reliability: Option<f64>,
}

pub struct AnnotationRecorder {
    db: SqlitePool,
    tracker: ReliabilityTracker,
}

impl AnnotationRecorder {
    pub fn new(db: SqlitePool, tracker: ReliabilityTracker) -> Self {
        Self { db, tracker }
    }

    /// Submit
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionReceipt> {
        let annotator_id = submission.annotator_id.trim();
        if annotator_id.is_empty() {
            return Err(Error::InvalidInput("annotator_id cannot be empty".to_string()));
        }
        let label = normalize_label(&submission.label)
            .ok_or_else(|| Error::InvalidInput("label cannot be empty".to_string()))?;
        let expected_label = submission.expected_label.as_deref().and_then(normalize_label);

        let image = db::images::get_image(&self.db, submission.image_id)
            .await?
            .ok_or(Error::ImageNotFound(submission.image_id))?;

        if submission.is_calibration && expected_label != image.ground_truth {
            return Err(Error::InvalidInput(format!(
                "expected_label does not match the calibration answer for image {}",
                image.id
            )));
        }

        db::annotators::ensure_annotator(&self.db, annotator_id).await?;

        let annotation = Annotation {
            id: uuid_utils::generate(),
            image_id: image.id,
            annotator_id: annotator_id.to_string(),
            label,
            created_at: time::now(),
            is_calibration: submission.is_calibration,
            expected_label,
        };

        let mut tx = self.db.begin().await?;

        // First statement is a write: the transaction holds the write lock
        // before it reads anything.
        if !db::annotations::insert_annotation(&mut *tx, &annotation).await? {
            tx.rollback().await?;
            debug!(
                image_id = %annotation.image_id,
                annotator_id,
                "Duplicate annotation ignored"
            );
            return Ok(SubmissionReceipt {
                recorded: false,
                reliability: None,
            });
        }

        let reliability = if annotation.is_calibration {
            let was_correct = annotation.expected_label.as_deref() == Some(annotation.label.as_str());
            Some(
                self.tracker
                    .record_outcome(&mut tx, annotator_id, was_correct)
                    .await?,
            )
        } else {
            None
        };

        db::images::increment_annotation_count(&mut *tx, annotation.image_id).await?;

        tx.commit().await?;

        info!(
            image_id = %annotation.image_id,
            annotator_id,
            label = %annotation.label,
            is_calibration = annotation.is_calibration,
            reliability = ?reliability,
            "Annotation recorded"
        );

        Ok(SubmissionReceipt {
            recorded: true,
            reliability,
        })
    }
}
