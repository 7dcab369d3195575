//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an image's ground truth came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthSource {
    /// Known answer supplied at ingestion; permanent
    Calibration,
    /// Derived from weighted votes; written only when validated
    Consensus,
}

impl TruthSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruthSource::Calibration => "calibration",
            TruthSource::Consensus => "consensus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calibration" => Some(TruthSource::Calibration),
            "consensus" => Some(TruthSource::Consensus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub filename: String,
    pub ground_truth: Option<String>,
    pub truth_source: Option<TruthSource>,
    /// True once consensus has frozen the label
    pub validated: bool,
    pub annotation_count: i64,
}

impl Image {
    /// Whether the ground truth is a calibration answer the aggregator must not touch
    pub fn has_calibration_truth(&self) -> bool {
        self.truth_source == Some(TruthSource::Calibration)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotator {
    pub annotator_id: String,
    pub calibration_attempts: i64,
    pub calibration_correct: i64,
    /// calibration_correct / calibration_attempts, 0 when no attempts
    pub reliability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub image_id: Uuid,
    pub annotator_id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub is_calibration: bool,
    pub expected_label: Option<String>,
}
