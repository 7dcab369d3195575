//! Species predictor seam
//!
//! The predictor attaches a non-binding label to calibration images so the AI
//! can be compared with the known answers. Its output never reaches annotators
//! and never enters consensus.

use async_trait::async_trait;
use fclab_common::Result;

#[async_trait]
pub trait SpeciesPredictor: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Predicted species code, `None` when the model has no answer
    async fn predict(&self, image_bytes: &[u8]) -> Result<Option<String>>;
}

/// Predictor used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPredictor;

#[async_trait]
impl SpeciesPredictor for NoopPredictor {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn predict(&self, _image_bytes: &[u8]) -> Result<Option<String>> {
        Ok(None)
    }
}
