use faceid_hw::Dimensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probe and stored descriptors disagree on length.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("descriptor dimension mismatch: expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Face descriptor: a fixed-length embedding vector (128-dimensional for
/// the usual landmark-aligned recognition nets).
///
/// Serialized as a bare JSON number array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to `other`.
    ///
    /// Both descriptors must have the same length; `self` is treated as the
    /// reference dimension in the error.
    pub fn euclidean_distance(&self, other: &Descriptor) -> Result<f32, DimensionMismatch> {
        if self.len() != other.len() {
            return Err(DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }

    /// Element-wise equality within `tolerance`.
    pub fn approx_eq(&self, other: &Descriptor, tolerance: f32) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// An enrolled face: a display name bound to one descriptor.
///
/// Names are not unique; enrolling the same person twice yields two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub descriptor: Descriptor,
}

impl Identity {
    pub fn new(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// Face region in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

/// A single detected face with its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Region in the coordinate space of the frame it was detected in.
    pub region: BoundingBox,
    /// Detector confidence in [0, 1].
    pub score: f32,
    pub descriptor: Descriptor,
}

impl Detection {
    /// Map the region from `from` (frame pixels) onto `to` (display pixels).
    ///
    /// The descriptor is geometry-independent and carried over unchanged.
    /// Empty dimensions on either side leave the region as-is.
    pub fn resize(&self, from: Dimensions, to: Dimensions) -> Detection {
        let region = match from.scale_to(to) {
            Some((sx, sy)) => self.region.scaled(sx, sy),
            None => self.region,
        };
        Detection {
            region,
            score: self.score,
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Outcome of one detector call.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Face(Detection),
    NoFace,
}

/// Distance reported when there is nothing to compare against.
///
/// Sits above any realistic acceptance threshold while remaining a finite float.
pub const NO_MATCH_DISTANCE: f32 = 1.0;

/// Nearest enrolled identity to a probe and its distance.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub identity: Option<Identity>,
    /// Euclidean distance; smaller is more similar.
    pub distance: f32,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            identity: None,
            distance: NO_MATCH_DISTANCE,
        }
    }
}
