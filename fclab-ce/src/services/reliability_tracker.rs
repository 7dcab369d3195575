//! Annotator Reliability Tracker
//!
//! Reliability is lifetime calibration accuracy: `correct / attempts`, 0 when
//! the annotator has no attempts. No decay, no windowing.

use crate::db;
use fclab_common::db::Annotator;
use fclab_common::{Error, Result};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// Reliability counters as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityReport {
    pub annotator_id: String,
    pub attempts: i64,
    pub correct: i64,
    pub accuracy: f64,
}

impl From<Annotator> for ReliabilityReport {
    fn from(annotator: Annotator) -> Self {
        Self {
            annotator_id: annotator.annotator_id,
            attempts: annotator.calibration_attempts,
            correct: annotator.calibration_correct,
            accuracy: annotator.reliability,
        }
    }
}

/// Reliability plus activity counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatorDetails {
    #[serde(flatten)]
    pub reliability: ReliabilityReport,
    pub annotations_total: i64,
    pub votes_cast: i64,
}

#[derive(Clone)]
pub struct ReliabilityTracker {
    db: SqlitePool,
}

impl ReliabilityTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Accumulate one calibration outcome and return the new reliability
    ///
    /// Runs on the caller's connection so it commits or rolls back together
    /// with the annotation that produced it.
    pub async fn record_outcome(
        &self,
        conn: &mut SqliteConnection,
        annotator_id: &str,
        was_correct: bool,
    ) -> Result<f64> {
        let annotator =
            db::annotators::record_calibration_outcome(&mut *conn, annotator_id, was_correct)
                .await?;

        debug!(
            annotator_id,
            was_correct,
            attempts = annotator.calibration_attempts,
            correct = annotator.calibration_correct,
            reliability = annotator.reliability,
            "Calibration outcome recorded"
        );

        Ok(annotator.reliability)
    }

    /// get-reliability
    pub async fn report(&self, annotator_id: &str) -> Result<ReliabilityReport> {
        db::annotators::get_annotator(&self.db, annotator_id)
            .await?
            .map(ReliabilityReport::from)
            .ok_or_else(|| Error::AnnotatorNotFound(annotator_id.to_string()))
    }

    /// Reliability plus annotation and vote counts
    pub async fn details(&self, annotator_id: &str) -> Result<AnnotatorDetails> {
        let reliability = self.report(annotator_id).await?;
        let annotations_total =
            db::annotations::count_for_annotator(&self.db, annotator_id).await?;
        let votes_cast = db::votes::count_for_annotator(&self.db, annotator_id).await?;

        Ok(AnnotatorDetails {
            reliability,
            annotations_total,
            votes_cast,
        })
    }
}
