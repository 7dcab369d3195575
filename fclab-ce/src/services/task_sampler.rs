//! Task Sampler
//!
//! Decides per request whether an annotator receives a calibration image or a
//! normal unlabeled image.
//!
//! # Policy
//! 1. `done` = calibration annotations already logged for the annotator
//! 2. `done < calibration_quota`: draw from unseen images carrying a ground truth
//! 3. Quota met: with probability `calibration_chance`, same draw as step 2
//! 4. No calibration image drawn: draw from unseen unvalidated images, else
//!    `NoTaskAvailable`
//! 5. `is_calibration = ground truth present AND gate open`, where the gate is
//!    open when the quota is unmet or the coin flip succeeded
//!
//! Each draw is uniform over the candidate set as it exists at call time. The
//! only memory across requests is the annotator's seen-set.

use crate::db;
use fclab_common::db::Image;
use fclab_common::{EngineParams, Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Image selected for an annotator
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTask {
    pub image: Image,
    pub is_calibration: bool,
    /// The image's ground truth, only when presented as a calibration question
    pub expected_label: Option<String>,
}

pub struct TaskSampler {
    db: SqlitePool,
    params: EngineParams,
    rng: Mutex<StdRng>,
}

impl TaskSampler {
    pub fn new(db: SqlitePool, params: EngineParams) -> Self {
        Self::with_rng(db, params, StdRng::from_entropy())
    }

    /// Sampler with a caller-supplied RNG (seeded in tests)
    pub fn with_rng(db: SqlitePool, params: EngineParams, rng: StdRng) -> Self {
        Self {
            db,
            params,
            rng: Mutex::new(rng),
        }
    }

    /// NextTask
    pub async fn next_task(&self, annotator_id: &str) -> Result<SampledTask> {
        let done_calibrations = db::annotations::count_calibrations(&self.db, annotator_id).await?;
        let quota_unmet = done_calibrations < i64::from(self.params.calibration_quota);
        let gate_open = quota_unmet || self.flip(self.params.calibration_chance);

        debug!(
            annotator_id,
            done_calibrations,
            quota = self.params.calibration_quota,
            gate_open,
            "Sampling task"
        );

        if gate_open {
            let candidates = db::images::calibration_candidates(&self.db, annotator_id).await?;
            if let Some(image_id) = self.pick(&candidates) {
                if let Some(image) = db::images::get_image(&self.db, image_id).await? {
                    return Ok(Self::present(image, gate_open));
                }
            }
            debug!(annotator_id, "No calibration image available, falling back to normal pool");
        }

        let candidates = db::images::unvalidated_candidates(&self.db, annotator_id).await?;
        let image_id = self
            .pick(&candidates)
            .ok_or_else(|| Error::NoTaskAvailable(annotator_id.to_string()))?;

        // Removed between listing and loading (blob eviction)
        let image = db::images::get_image(&self.db, image_id)
            .await?
            .ok_or_else(|| Error::NoTaskAvailable(annotator_id.to_string()))?;

        Ok(Self::present(image, gate_open))
    }

    fn present(image: Image, gate_open: bool) -> SampledTask {
        let is_calibration = image.ground_truth.is_some() && gate_open;
        let expected_label = if is_calibration {
            image.ground_truth.clone()
        } else {
            None
        };

        SampledTask {
            image,
            is_calibration,
            expected_label,
        }
    }

    fn pick(&self, candidates: &[Uuid]) -> Option<Uuid> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates.choose(&mut *rng).copied()
    }

    fn flip(&self, probability: f64) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(probability.clamp(0.0, 1.0))
    }
}
