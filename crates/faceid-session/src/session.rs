//! Session façade: wires the context, detection loop and enrollment
//! together and handles lifecycle events from the host.

use crate::config::Config;
use crate::context::SessionContext;
use crate::detection_loop::DetectionLoop;
use crate::enrollment::{EnrollResult, Enrollment};
use crate::fallback::{self, FallbackError};
use crate::status::{StatusKind, StatusSurface};
use faceid_core::{DescriptorStore, Detector, KvError, SqliteKv};
use faceid_hw::CameraProvider;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("storage: {0}")]
    Storage(#[from] KvError),
}

pub struct Session {
    ctx: Arc<SessionContext>,
    detection: DetectionLoop,
    enrollment: Enrollment,
}

impl Session {
    pub fn new(ctx: SessionContext) -> Self {
        let ctx = Arc::new(ctx);
        Self {
            detection: DetectionLoop::new(ctx.clone()),
            enrollment: Enrollment::new(ctx.clone()),
            ctx,
        }
    }

    /// Open a session backed by the SQLite database at `config.db_path`.
    pub fn open(config: Config, detector: Arc<dyn Detector>) -> Result<Self, SessionError> {
        let kv = SqliteKv::open(&config.db_path)?;
        let store = DescriptorStore::with_key(Box::new(kv), config.storage_key.clone());
        Ok(Self::new(SessionContext::new(config, detector, store)))
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    pub fn status(&self) -> &StatusSurface {
        self.ctx.status()
    }

    /// Load models and open the camera concurrently, then start polling if
    /// a frame source came up.
    pub async fn bootstrap(&self, camera: &dyn CameraProvider) {
        tracing::info!(enrolled = self.ctx.store().lock().await.len(), "session starting");

        let (models_ok, _) = tokio::join!(self.load_models(), self.init_camera(camera));
        if !models_ok {
            self.status()
                .set_status(StatusKind::Error, "Face models failed to load. Use manual login.");
        }

        if self.ctx.has_frame_source() {
            self.detection.start();
        }
    }

    async fn load_models(&self) -> bool {
        self.status().set_status(StatusKind::Loading, "Loading face models…");
        match self.ctx.detector().load_models().await {
            Ok(()) => {
                self.ctx.set_models_ready(true);
                self.status()
                    .set_status(StatusKind::Ready, "Models loaded. Align your face in frame.");
                tracing::info!("face models loaded");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load face models");
                false
            }
        }
    }

    async fn init_camera(&self, camera: &dyn CameraProvider) -> bool {
        match camera.open().await {
            Ok(source) => {
                self.ctx.attach_frame_source(source);
                self.status()
                    .set_status(StatusKind::Ready, "Camera ready. Hold still for verification.");
                true
            }
            Err(e) if e.is_unsupported() => {
                tracing::warn!("no camera capability; manual login only");
                self.status()
                    .set_status(StatusKind::Error, "Camera not supported. Use manual login.");
                self.status().notify("Camera not available on this device.");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "camera unavailable");
                self.status()
                    .set_status(StatusKind::Error, "Camera access denied. Use manual login.");
                self.status().notify("Camera permission needed for face login.");
                false
            }
        }
    }

    /// Hidden sessions stop polling; visible ones resume if a frame source
    /// is still attached.
    pub fn on_visibility_change(&self, visible: bool) {
        if !visible {
            tracing::debug!("session hidden");
            self.detection.stop();
        } else if self.ctx.has_frame_source() {
            tracing::debug!("session visible");
            self.detection.start();
        }
    }

    pub async fn enroll(&self, name: &str) -> EnrollResult {
        self.enrollment.enroll(name).await
    }

    pub fn manual_login(&self, email: &str, password: &str) -> Result<(), FallbackError> {
        fallback::manual_login(self.status(), email, password)
    }

    /// Stop polling ahead of teardown.
    pub fn shutdown(&self) {
        self.detection.stop();
        tracing::info!("session shut down");
    }
}
