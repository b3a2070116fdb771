//! Nearest-identity search and the acceptance policy.
//!
//! The search and the threshold are deliberately separate types: a matcher
//! only ever reports raw distance, and [`MatchThreshold`] decides.

use crate::types::{Descriptor, DimensionMismatch, Identity, MatchResult};

/// Default acceptance threshold. Smaller is stricter.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.45;

/// Strategy for finding the enrolled identity closest to a probe.
///
/// Implementations must return [`MatchResult::no_match`] for an empty
/// candidate set and must reject descriptors of a different dimension
/// instead of comparing them.
pub trait Matcher: Send + Sync {
    fn best_match(
        &self,
        probe: &Descriptor,
        candidates: &[Identity],
    ) -> Result<MatchResult, DimensionMismatch>;
}

/// Exhaustive Euclidean scan, O(n·d) per probe.
///
/// Ties resolve to the earliest candidate in store order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn best_match(
        &self,
        probe: &Descriptor,
        candidates: &[Identity],
    ) -> Result<MatchResult, DimensionMismatch> {
        let mut best: Option<(usize, f32)> = None;

        for (i, candidate) in candidates.iter().enumerate() {
            let distance = probe.euclidean_distance(&candidate.descriptor)?;
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }

        Ok(match best {
            Some((idx, distance)) => MatchResult {
                identity: Some(candidates[idx].clone()),
                distance,
            },
            None => MatchResult::no_match(),
        })
    }
}

/// Acceptance policy: a candidate must exist and lie strictly closer than
/// the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThreshold(f32);

impl MatchThreshold {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn accepts(&self, result: &MatchResult) -> bool {
        result.identity.is_some() && result.distance < self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_MATCH_THRESHOLD)
    }
}
