//! Frame type and display geometry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a frame or of the surface it is displayed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero (no usable geometry yet).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Per-axis scale factors mapping coordinates in `self` onto `target`.
    ///
    /// Returns `None` if either side is empty.
    pub fn scale_to(&self, target: Dimensions) -> Option<(f32, f32)> {
        if self.is_empty() || target.is_empty() {
            return None;
        }
        Some((
            target.width as f32 / self.width as f32,
            target.height as f32 / self.height as f32,
        ))
    }
}

/// A captured camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data, layout defined by the frame source.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

// Pixel buffers are large; print their length only.
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish()
    }
}
