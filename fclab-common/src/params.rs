//! Engine parameter management
//!
//! Calibration and consensus tuning values live in the `settings` table and are
//! loaded once at startup into an immutable [`EngineParams`] that is passed to
//! each component.
//!
//! # Error Handling Policy
//!
//! 1. Database connection error: return Err (fail startup)
//! 2. Parameter missing: log WARN, use default, continue
//! 3. Type mismatch or out of range: log WARN, use default, continue
//! 4. Process all parameters independently (no fail-fast)

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Engine tuning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Calibration answers an annotator must give before normal tasks dominate
    pub calibration_quota: u32,

    /// Probability of a calibration task once the quota is met
    pub calibration_chance: f64,

    /// Minimum reliability required to cast a consensus vote
    pub reliability_floor: f64,

    /// Accumulated vote weight required before any decision is taken
    pub weight_threshold: f64,

    /// Confidence strictly above which an image is validated
    pub upper_confidence: f64,

    /// Confidence strictly below which a consensus label is rejected
    pub lower_confidence: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            calibration_quota: 5,
            calibration_chance: 0.10,
            reliability_floor: 0.75,
            weight_threshold: 10.0,
            upper_confidence: 0.8,
            lower_confidence: 0.6,
        }
    }
}

/// Metadata for one database-backed parameter
pub struct ParamMetadata {
    /// Settings table key
    pub key: &'static str,
    /// Default value (string form, as stored)
    pub default_value: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Returns Err with a message if the stored string is unusable
    pub validator: fn(&str) -> std::result::Result<(), String>,
}

fn validate_unit_interval(key: &str, s: &str) -> std::result::Result<(), String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("{}: invalid number format", key))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("{}: value {} out of range [0.0, 1.0]", key, v));
    }
    Ok(())
}

static PARAM_METADATA: [ParamMetadata; 6] = [
    ParamMetadata {
        key: "calibration_quota",
        default_value: "5",
        description: "Calibration answers required before normal tasks dominate",
        validator: |s| {
            let v: u32 = s
                .parse()
                .map_err(|_| "calibration_quota: invalid number format".to_string())?;
            if v > 1000 {
                return Err(format!("calibration_quota: value {} out of range [0, 1000]", v));
            }
            Ok(())
        },
    },
    ParamMetadata {
        key: "calibration_chance",
        default_value: "0.1",
        description: "Probability of a calibration task after the quota is met",
        validator: |s| validate_unit_interval("calibration_chance", s),
    },
    ParamMetadata {
        key: "reliability_floor",
        default_value: "0.75",
        description: "Minimum annotator reliability allowed to vote",
        validator: |s| validate_unit_interval("reliability_floor", s),
    },
    ParamMetadata {
        key: "consensus_weight_threshold",
        default_value: "10.0",
        description: "Accumulated weight required before a consensus decision",
        validator: |s| {
            let v: f64 = s.parse().map_err(|_| {
                "consensus_weight_threshold: invalid number format".to_string()
            })?;
            if !v.is_finite() || v <= 0.0 {
                return Err(format!(
                    "consensus_weight_threshold: value {} must be a positive number",
                    v
                ));
            }
            Ok(())
        },
    },
    ParamMetadata {
        key: "consensus_upper_confidence",
        default_value: "0.8",
        description: "Confidence strictly above which an image is validated",
        validator: |s| validate_unit_interval("consensus_upper_confidence", s),
    },
    ParamMetadata {
        key: "consensus_lower_confidence",
        default_value: "0.6",
        description: "Confidence strictly below which a consensus label is rejected",
        validator: |s| validate_unit_interval("consensus_lower_confidence", s),
    },
];

impl EngineParams {
    /// Metadata for all database-backed engine parameters
    ///
    /// Single source of truth for keys, defaults and validation ranges. The
    /// defaults seeded by `db::init_database` are taken from here.
    pub fn metadata() -> &'static [ParamMetadata] {
        &PARAM_METADATA
    }

    /// Apply one validated string value to the matching field
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "calibration_quota" => {
                if let Ok(v) = value.parse() {
                    self.calibration_quota = v;
                }
            }
            "calibration_chance" => {
                if let Ok(v) = value.parse() {
                    self.calibration_chance = v;
                }
            }
            "reliability_floor" => {
                if let Ok(v) = value.parse() {
                    self.reliability_floor = v;
                }
            }
            "consensus_weight_threshold" => {
                if let Ok(v) = value.parse() {
                    self.weight_threshold = v;
                }
            }
            "consensus_upper_confidence" => {
                if let Ok(v) = value.parse() {
                    self.upper_confidence = v;
                }
            }
            "consensus_lower_confidence" => {
                if let Ok(v) = value.parse() {
                    self.lower_confidence = v;
                }
            }
            _ => {}
        }
    }

    /// Build parameters from raw `(key, value)` pairs, validating each one
    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut params = Self::default();
        let values: Vec<_> = values.into_iter().collect();

        for meta in Self::metadata() {
            let stored = values
                .iter()
                .find(|(key, _)| *key == meta.key)
                .and_then(|(_, value)| *value);

            match stored {
                Some(value) => match (meta.validator)(value) {
                    Ok(()) => params.apply(meta.key, value),
                    Err(e) => warn!("{}, using default ({})", e, meta.default_value),
                },
                None => warn!(
                    "{} not found in settings, using default ({})",
                    meta.key, meta.default_value
                ),
            }
        }

        if params.lower_confidence > params.upper_confidence {
            let defaults = Self::default();
            warn!(
                "consensus_lower_confidence {} exceeds consensus_upper_confidence {}, using defaults ({}, {})",
                params.lower_confidence,
                params.upper_confidence,
                defaults.lower_confidence,
                defaults.upper_confidence
            );
            params.lower_confidence = defaults.lower_confidence;
            params.upper_confidence = defaults.upper_confidence;
        }

        params
    }

    /// Load parameters from the settings table
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(pool)
                .await?;

        let params = Self::from_values(
            rows.iter()
                .map(|(key, value)| (key.as_str(), value.as_deref())),
        );

        info!(
            calibration_quota = params.calibration_quota,
            calibration_chance = params.calibration_chance,
            reliability_floor = params.reliability_floor,
            weight_threshold = params.weight_threshold,
            upper_confidence = params.upper_confidence,
            lower_confidence = params.lower_confidence,
            "Engine parameters loaded"
        );

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_metadata() {
        let from_metadata = EngineParams::from_values(
            EngineParams::metadata()
                .iter()
                .map(|m| (m.key, Some(m.default_value))),
        );
        assert_eq!(from_metadata, EngineParams::default());
    }

    #[test]
    fn test_valid_values_applied() {
        let params = EngineParams::from_values([
            ("calibration_quota", Some("8")),
            ("calibration_chance", Some("0.25")),
            ("reliability_floor", Some("0.5")),
            ("consensus_weight_threshold", Some("4.5")),
        ]);
        assert_eq!(params.calibration_quota, 8);
        assert_eq!(params.calibration_chance, 0.25);
        assert_eq!(params.reliability_floor, 0.5);
        assert_eq!(params.weight_threshold, 4.5);
        assert_eq!(params.upper_confidence, 0.8);
    }

    #[test]
    fn test_out_of_range_falls_back_to_default() {
        let params = EngineParams::from_values([
            ("calibration_chance", Some("1.5")),
            ("reliability_floor", Some("abc")),
            ("consensus_weight_threshold", Some("-3")),
            ("calibration_quota", None),
        ]);
        assert_eq!(params, EngineParams::default());
    }

    #[test]
    fn test_inverted_bands_reset() {
        let params = EngineParams::from_values([
            ("consensus_upper_confidence", Some("0.5")),
            ("consensus_lower_confidence", Some("0.7")),
        ]);
        assert_eq!(params.upper_confidence, 0.8);
        assert_eq!(params.lower_confidence, 0.6);
    }

    #[test]
    fn test_validator_rejects_bad_quota() {
        let meta = EngineParams::metadata()
            .iter()
            .find(|m| m.key == "calibration_quota")
            .unwrap();
        assert!((meta.validator)("5").is_ok());
        assert!((meta.validator)("-1").is_err());
        assert!((meta.validator)("5000").is_err());
    }
}
