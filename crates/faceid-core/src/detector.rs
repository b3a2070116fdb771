//! Face detector/encoder capability.
//!
//! The neural networks live outside this workspace. A [`Detector`] turns one
//! frame into at most one face together with its descriptor.

use crate::types::DetectionOutcome;
use async_trait::async_trait;
use faceid_hw::Frame;
use thiserror::Error;

/// Minimum detector score while polling. Loose, because a bad candidate is
/// still filtered by the match threshold.
pub const LOOP_SCORE_THRESHOLD: f32 = 0.5;
/// Minimum detector score for enrollment. A bad enrollment stays in the
/// store, so this is stricter than [`LOOP_SCORE_THRESHOLD`].
pub const ENROLL_SCORE_THRESHOLD: f32 = 0.55;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Per-call detection options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub score_threshold: f32,
}

impl DetectorOptions {
    pub fn new(score_threshold: f32) -> Self {
        Self { score_threshold }
    }
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self::new(LOOP_SCORE_THRESHOLD)
    }
}

#[async_trait]
pub trait Detector: Send + Sync {
    /// Fetch and initialise the detection, landmark and recognition models.
    async fn load_models(&self) -> Result<(), DetectorError>;

    /// Detect the single most prominent face scoring at least
    /// `options.score_threshold` and compute its descriptor.
    async fn detect_single_face(
        &self,
        frame: &Frame,
        options: DetectorOptions,
    ) -> Result<DetectionOutcome, DetectorError>;
}
