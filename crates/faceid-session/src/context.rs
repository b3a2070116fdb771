//! Per-session state shared by the detection loop and enrollment.

use crate::config::Config;
use crate::status::StatusSurface;
use faceid_core::{
    Descriptor, DescriptorStore, Detector, DimensionMismatch, EuclideanMatcher, Identity,
    MatchResult, MatchThreshold, Matcher,
};
use faceid_hw::{Dimensions, FrameSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Owns everything a session needs: store cache, readiness, the attached
/// frame source, display geometry and the status surface.
pub struct SessionContext {
    config: Config,
    store: Arc<Mutex<DescriptorStore>>,
    matcher: Box<dyn Matcher>,
    threshold: MatchThreshold,
    detector: Arc<dyn Detector>,
    frame_source: RwLock<Option<Arc<dyn FrameSource>>>,
    display: RwLock<Dimensions>,
    models_ready: AtomicBool,
    status: StatusSurface,
}

impl SessionContext {
    pub fn new(config: Config, detector: Arc<dyn Detector>, store: DescriptorStore) -> Self {
        let threshold = MatchThreshold::new(config.match_threshold);
        let status = StatusSurface::new(config.notice_ttl);
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
            matcher: Box::new(EuclideanMatcher),
            threshold,
            detector,
            frame_source: RwLock::new(None),
            display: RwLock::new(Dimensions::default()),
            models_ready: AtomicBool::new(false),
            status,
        }
    }

    /// Replace the linear scan with another search strategy.
    pub fn with_matcher(mut self, matcher: impl Matcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> &StatusSurface {
        &self.status
    }

    pub fn detector(&self) -> &dyn Detector {
        self.detector.as_ref()
    }

    pub fn threshold(&self) -> MatchThreshold {
        self.threshold
    }

    /// Shared so blocking writes can own the guard off the runtime thread.
    pub fn store(&self) -> &Arc<Mutex<DescriptorStore>> {
        &self.store
    }

    /// Snapshot of the cached identities.
    pub async fn enrolled(&self) -> Vec<Identity> {
        self.store.lock().await.identities().to_vec()
    }

    /// Nearest enrolled identity to `probe` from the current cache.
    pub async fn best_match(&self, probe: &Descriptor) -> Result<MatchResult, DimensionMismatch> {
        let store = self.store.lock().await;
        self.matcher.best_match(probe, store.identities())
    }

    pub fn models_ready(&self) -> bool {
        self.models_ready.load(Ordering::Acquire)
    }

    pub fn set_models_ready(&self, ready: bool) {
        self.models_ready.store(ready, Ordering::Release);
    }

    /// Attach a live frame source; display geometry follows its dimensions.
    pub fn attach_frame_source(&self, source: Arc<dyn FrameSource>) {
        let dims = source.dimensions();
        *self.display.write().unwrap_or_else(PoisonError::into_inner) = dims;
        *self.frame_source.write().unwrap_or_else(PoisonError::into_inner) = Some(source);
        tracing::info!(width = dims.width, height = dims.height, "frame source attached");
    }

    pub fn detach_frame_source(&self) {
        let previous = self
            .frame_source
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::info!("frame source detached");
        }
    }

    /// The attached frame source, if it is still live.
    pub fn frame_source(&self) -> Option<Arc<dyn FrameSource>> {
        self.frame_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|s| s.is_live())
            .cloned()
    }

    pub fn has_frame_source(&self) -> bool {
        self.frame_source().is_some()
    }

    /// Dimensions detection geometry is mapped onto before rendering.
    pub fn display_dimensions(&self) -> Dimensions {
        *self.display.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_display_dimensions(&self, dims: Dimensions) {
        *self.display.write().unwrap_or_else(PoisonError::into_inner) = dims;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StillSource};

    #[test]
    fn test_attach_sets_display_dimensions() {
        let ctx = context(Config::default());
        assert!(!ctx.has_frame_source());
        ctx.attach_frame_source(StillSource::new(640, 480));
        assert!(ctx.has_frame_source());
        assert_eq!(ctx.display_dimensions(), Dimensions::new(640, 480));

        ctx.set_display_dimensions(Dimensions::new(320, 240));
        assert_eq!(ctx.display_dimensions(), Dimensions::new(320, 240));

        ctx.detach_frame_source();
        assert!(!ctx.has_frame_source());
    }

    #[test]
    fn test_dead_source_is_ignored() {
        let ctx = context(Config::default());
        let source = StillSource::new(640, 480);
        source.set_live(false);
        ctx.attach_frame_source(source);
        assert!(!ctx.has_frame_source());
    }

    #[test]
    fn test_models_ready_flag() {
        let ctx = context(Config::default());
        assert!(!ctx.models_ready());
        ctx.set_models_ready(true);
        assert!(ctx.models_ready());
    }

    struct AlwaysFirst;

    impl Matcher for AlwaysFirst {
        fn best_match(
            &self,
            _probe: &Descriptor,
            candidates: &[Identity],
        ) -> Result<MatchResult, DimensionMismatch> {
            Ok(match candidates.first() {
                Some(c) => MatchResult { identity: Some(c.clone()), distance: 0.0 },
                None => MatchResult::no_match(),
            })
        }
    }

    #[tokio::test]
    async fn test_matcher_is_swappable() {
        let ctx = context(Config::default()).with_matcher(AlwaysFirst);
        ctx.store()
            .lock()
            .await
            .append("Alice", Descriptor::new(vec![1.0, 1.0]))
            .unwrap();

        let result = ctx.best_match(&Descriptor::new(vec![-5.0, 9.0])).await.unwrap();
        assert_eq!(result.distance, 0.0);
        assert_eq!(result.identity.unwrap().name, "Alice");
    }
}
