//! Consensus Aggregator
//!
//! Accumulates reliability-weighted votes per image and decides between
//! validate, reject and keep-pending.
//!
//! # Decision
//! - `total_weight < weight_threshold`: Pending, no label
//! - `confidence > upper_confidence`: Validated, image frozen
//! - `confidence < lower_confidence`: Rejected, revocable consensus label cleared
//! - otherwise: Pending with the leading label (hysteresis band)
//!
//! Both band comparisons are strict. Ties on the leading weight go to the
//! lexicographically smallest label.

use crate::db;
use crate::services::image_locks::ImageLocks;
use fclab_common::db::Image;
use fclab_common::labels::normalize_label;
use fclab_common::{time, EngineParams, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of casting a vote
///
/// Reports the decision over the image's vote log. Images holding a calibration
/// answer are never mutated, so `Validated` there means the votes agree strongly,
/// not that the image was frozen; read the image to tell the two apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConsensusOutcome {
    Pending {
        label: Option<String>,
        confidence: Option<f64>,
        total_weight: f64,
    },
    Validated {
        label: String,
        confidence: f64,
        total_weight: f64,
    },
    Rejected {
        label: String,
        confidence: f64,
        total_weight: f64,
    },
}

impl ConsensusOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Pending { label, .. } => label.as_deref(),
            Self::Validated { label, .. } | Self::Rejected { label, .. } => Some(label),
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Pending { confidence, .. } => *confidence,
            Self::Validated { confidence, .. } | Self::Rejected { confidence, .. } => {
                Some(*confidence)
            }
        }
    }

    pub fn total_weight(&self) -> f64 {
        match self {
            Self::Pending { total_weight, .. }
            | Self::Validated { total_weight, .. }
            | Self::Rejected { total_weight, .. } => *total_weight,
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Accumulated weight per label for one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsensusTally {
    pub weights: BTreeMap<String, f64>,
    pub total_weight: f64,
}

impl ConsensusTally {
    /// Sum `(label, weight)` pairs in the order given
    pub fn from_votes<I, S>(votes: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut tally = Self::default();
        for (label, weight) in votes {
            *tally.weights.entry(label.into()).or_insert(0.0) += weight;
            tally.total_weight += weight;
        }
        tally
    }

    /// Label with the largest weight, smallest label on ties
    pub fn leader(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        // Ascending key order: only a strictly larger weight displaces the leader
        for (label, &weight) in &self.weights {
            match best {
                Some((_, best_weight)) if weight <= best_weight => {}
                _ => best = Some((label.as_str(), weight)),
            }
        }
        best
    }

    /// Fraction of the total weight carried by `label`
    pub fn share_of(&self, label: &str) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        self.weights.get(label).copied().unwrap_or(0.0) / self.total_weight
    }
}

/// Apply the threshold and confidence bands to a tally
pub fn decide(tally: &ConsensusTally, params: &EngineParams) -> ConsensusOutcome {
    let total_weight = tally.total_weight;

    let leader = match tally.leader() {
        Some(leader) if total_weight >= params.weight_threshold => leader,
        _ => {
            return ConsensusOutcome::Pending {
                label: None,
                confidence: None,
                total_weight,
            }
        }
    };

    let (label, weight) = leader;
    let confidence = weight / total_weight;
    let label = label.to_string();

    if confidence > params.upper_confidence {
        ConsensusOutcome::Validated {
            label,
            confidence,
            total_weight,
        }
    } else if confidence < params.lower_confidence {
        ConsensusOutcome::Rejected {
            label,
            confidence,
            total_weight,
        }
    } else {
        ConsensusOutcome::Pending {
            label: Some(label),
            confidence: Some(confidence),
            total_weight,
        }
    }
}

pub struct ConsensusAggregator {
    db: SqlitePool,
    params: EngineParams,
    locks: ImageLocks,
}

impl ConsensusAggregator {
    pub fn new(db: SqlitePool, params: EngineParams) -> Self {
        Self {
            db,
            params,
            locks: ImageLocks::new(),
        }
    }

    /// CastVote
    ///
    /// The vote weight is the annotator's reliability at call time. Append,
    /// recompute and image mutation commit together under the image's lock.
    pub async fn cast_vote(
        &self,
        image_id: Uuid,
        annotator_id: &str,
        label: &str,
    ) -> Result<ConsensusOutcome> {
        let label = normalize_label(label)
            .ok_or_else(|| Error::InvalidInput("label cannot be empty".to_string()))?;

        let _guard = self.locks.acquire(image_id).await;

        let image = db::images::get_image(&self.db, image_id)
            .await?
            .ok_or(Error::ImageNotFound(image_id))?;
        let annotator = db::annotators::get_annotator(&self.db, annotator_id)
            .await?
            .ok_or_else(|| Error::AnnotatorNotFound(annotator_id.to_string()))?;

        if annotator.reliability < self.params.reliability_floor {
            debug!(
                %image_id,
                annotator_id,
                reliability = annotator.reliability,
                floor = self.params.reliability_floor,
                "Vote refused"
            );
            return Err(Error::InsufficientReliability {
                reliability: annotator.reliability,
                floor: self.params.reliability_floor,
            });
        }

        if image.validated {
            return self.frozen_outcome(&image).await;
        }

        let weight = annotator.reliability;
        let mut tx = self.db.begin().await?;

        let appended =
            db::votes::insert_vote(&mut *tx, image_id, annotator_id, &label, weight, time::now())
                .await?;
        if !appended {
            debug!(%image_id, annotator_id, "Duplicate vote ignored, recomputing outcome");
        }

        let tally = ConsensusTally::from_votes(db::votes::weights_for_image(&mut *tx, image_id).await?);
        let outcome = decide(&tally, &self.params);

        let mutated = if image.has_calibration_truth() {
            false
        } else {
            match &outcome {
                ConsensusOutcome::Validated { label, .. } => {
                    db::images::validate_with_consensus(&mut *tx, image_id, label).await?
                }
                ConsensusOutcome::Rejected { .. } => {
                    db::images::clear_consensus_truth(&mut *tx, image_id).await?
                }
                ConsensusOutcome::Pending { .. } => false,
            }
        };

        tx.commit().await?;

        match &outcome {
            ConsensusOutcome::Validated {
                label, confidence, ..
            } => info!(
                %image_id,
                label = %label,
                confidence,
                total_weight = tally.total_weight,
                mutated,
                "Consensus reached"
            ),
            ConsensusOutcome::Rejected {
                label, confidence, ..
            } => info!(
                %image_id,
                label = %label,
                confidence,
                total_weight = tally.total_weight,
                mutated,
                "Consensus rejected"
            ),
            ConsensusOutcome::Pending { .. } => debug!(
                %image_id,
                annotator_id,
                weight,
                total_weight = tally.total_weight,
                "Vote recorded, consensus pending"
            ),
        }

        Ok(outcome)
    }

    /// Outcome of a validated image, recomputed from its log without voting
    async fn frozen_outcome(&self, image: &Image) -> Result<ConsensusOutcome> {
        let tally = ConsensusTally::from_votes(db::votes::weights_for_image(&self.db, image.id).await?);
        let label = image.ground_truth.clone().ok_or_else(|| {
            Error::Internal(format!("Validated image {} has no ground truth", image.id))
        })?;

        debug!(image_id = %image.id, label = %label, "Vote on validated image ignored");

        Ok(ConsensusOutcome::Validated {
            confidence: tally.share_of(&label),
            label,
            total_weight: tally.total_weight,
        })
    }
}
