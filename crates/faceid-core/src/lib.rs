//! faceid-core — Enrollment and matching engine.
//!
//! Holds the descriptor model, the nearest-identity matcher, the persisted
//! descriptor store and the detector capability it is fed by.

pub mod detector;
pub mod kv;
pub mod matcher;
pub mod store;
pub mod types;

pub use detector::{Detector, DetectorError, DetectorOptions};
pub use kv::{KeyValueStore, KvError, MemoryKv, SqliteKv};
pub use matcher::{EuclideanMatcher, MatchThreshold, Matcher};
pub use store::{DescriptorStore, StoreError};
pub use types::{
    BoundingBox, Descriptor, Detection, DetectionOutcome, DimensionMismatch, Identity, MatchResult,
};
