//! Test doubles for the detector, frame source and camera capabilities.

use crate::config::Config;
use crate::context::SessionContext;
use async_trait::async_trait;
use faceid_core::{
    BoundingBox, Descriptor, DescriptorStore, Detection, DetectionOutcome, Detector,
    DetectorError, DetectorOptions, MemoryKv,
};
use faceid_hw::{CameraError, CameraProvider, Dimensions, Frame, FrameSource};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Lets a test hold a detector call open until it decides to release it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

pub struct FakeDetector {
    outcome: Mutex<DetectionOutcome>,
    fail_next: AtomicBool,
    fail_load: AtomicBool,
    calls: AtomicUsize,
    last_options: Mutex<Option<DetectorOptions>>,
    gate: Option<Gate>,
}

impl FakeDetector {
    pub fn new(outcome: DetectionOutcome) -> Arc<Self> {
        Arc::new(Self::build(outcome, None))
    }

    pub fn gated(outcome: DetectionOutcome) -> Arc<Self> {
        Arc::new(Self::build(outcome, Some(Gate::default())))
    }

    fn build(outcome: DetectionOutcome, gate: Option<Gate>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            fail_next: AtomicBool::new(false),
            fail_load: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            gate,
        }
    }

    pub fn set_outcome(&self, outcome: DetectionOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn fail_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<DetectorOptions> {
        *self.last_options.lock().unwrap()
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("detector was not built with a gate")
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn load_models(&self) -> Result<(), DetectorError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(DetectorError::ModelLoad("weights unreachable".into()));
        }
        Ok(())
    }

    async fn detect_single_face(
        &self,
        _frame: &Frame,
        options: DetectorOptions,
    ) -> Result<DetectionOutcome, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DetectorError::InferenceFailed("tensor shape".into()));
        }
        Ok(self.outcome.lock().unwrap().clone())
    }
}

pub struct StillSource {
    dims: Dimensions,
    live: AtomicBool,
    fail: AtomicBool,
    sequence: AtomicU32,
}

impl StillSource {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            dims: Dimensions::new(width, height),
            live: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
        })
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    pub fn fail_capture(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl FrameSource for StillSource {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn capture_frame(&self) -> Result<Frame, CameraError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CameraError::CaptureFailed("stream stalled".into()));
        }
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::new(Vec::new(), self.dims.width, self.dims.height, seq))
    }
}

pub enum FakeCamera {
    Ready(Arc<StillSource>),
    Unsupported,
    Denied,
}

#[async_trait]
impl CameraProvider for FakeCamera {
    async fn open(&self) -> Result<Arc<dyn FrameSource>, CameraError> {
        match self {
            FakeCamera::Ready(source) => Ok(source.clone()),
            FakeCamera::Unsupported => Err(CameraError::Unsupported),
            FakeCamera::Denied => Err(CameraError::PermissionDenied("NotAllowedError".into())),
        }
    }
}

pub fn face(values: &[f32]) -> DetectionOutcome {
    DetectionOutcome::Face(Detection {
        region: BoundingBox { x: 100.0, y: 50.0, width: 200.0, height: 100.0 },
        score: 0.9,
        descriptor: Descriptor::new(values.to_vec()),
    })
}

/// Config whose timer never fires on its own during a test.
pub fn manual_config() -> Config {
    Config {
        detection_interval: Duration::from_secs(3600),
        ..Config::default()
    }
}

pub fn context(config: Config) -> SessionContext {
    context_with(config, FakeDetector::new(DetectionOutcome::NoFace))
}

pub fn context_with(config: Config, detector: Arc<FakeDetector>) -> SessionContext {
    let store = DescriptorStore::with_key(Box::new(MemoryKv::new()), config.storage_key.clone());
    SessionContext::new(config, detector, store)
}

/// Models loaded and a 640×480 source attached.
pub fn ready_context(config: Config, detector: Arc<FakeDetector>) -> Arc<SessionContext> {
    let ctx = context_with(config, detector);
    ctx.set_models_ready(true);
    ctx.attach_frame_source(StillSource::new(640, 480));
    Arc::new(ctx)
}
