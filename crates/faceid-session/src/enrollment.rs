//! One-shot enrollment: capture a single face and bind it to a name.

use crate::context::SessionContext;
use crate::status::Outcome;
use faceid_core::{DetectionOutcome, DetectorError, DetectorOptions, Identity, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("models loading")]
    ModelsLoading,
    #[error("camera unavailable")]
    CameraUnavailable,
    #[error("name required")]
    NameRequired,
    #[error("capture failed")]
    CaptureFailed,
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("store task failed: {0}")]
    StoreTask(#[from] JoinError),
}

pub type EnrollResult = Result<Identity, EnrollError>;

#[derive(Clone)]
pub struct Enrollment {
    ctx: Arc<SessionContext>,
}

impl Enrollment {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }

    /// Capture one face at the enrollment score threshold and persist it
    /// under `name` (trimmed).
    ///
    /// Runs independently of the detection loop. Nothing is written unless
    /// a face was detected.
    pub async fn enroll(&self, name: &str) -> EnrollResult {
        let result = self.capture_and_commit(name).await;
        self.report(&result);
        result
    }

    async fn capture_and_commit(&self, name: &str) -> EnrollResult {
        let ctx = &self.ctx;

        if !ctx.models_ready() {
            return Err(EnrollError::ModelsLoading);
        }
        let Some(source) = ctx.frame_source() else {
            return Err(EnrollError::CameraUnavailable);
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(EnrollError::NameRequired);
        }

        let frame = source.capture_frame().map_err(|e| {
            tracing::warn!(error = %e, "enroll: frame capture failed");
            EnrollError::CaptureFailed
        })?;

        let options = DetectorOptions::new(ctx.config().enroll_score_threshold);
        let detected = {
            let _busy = ctx.status().busy();
            ctx.detector().detect_single_face(&frame, options).await
        };

        let detection = match detected? {
            DetectionOutcome::Face(detection) => detection,
            DetectionOutcome::NoFace => return Err(EnrollError::CaptureFailed),
        };
        tracing::debug!(score = detection.score, dim = detection.descriptor.len(), "enroll: face captured");

        let identity = Identity::new(name, detection.descriptor);
        let mut store = ctx.store().clone().lock_owned().await;
        let (name, descriptor) = (identity.name.clone(), identity.descriptor.clone());
        // The backend may be SQLite; keep its writes off the runtime threads.
        tokio::task::spawn_blocking(move || store.append(&name, descriptor)).await??;

        Ok(identity)
    }

    fn report(&self, result: &EnrollResult) {
        let status = self.ctx.status();
        match result {
            Ok(identity) => {
                status.set_outcome(Outcome::success(format!(
                    "Registered {}. You can now login with face.",
                    identity.name
                )));
                status.notify("Face registered locally.");
            }
            Err(EnrollError::ModelsLoading) => status.notify("Models are still loading."),
            Err(EnrollError::CameraUnavailable) => status.notify("Camera unavailable."),
            Err(EnrollError::NameRequired) => status.notify("Enter a display name."),
            Err(EnrollError::CaptureFailed) => {
                status.set_outcome(Outcome::danger("Unable to capture face. Try again."));
            }
            Err(EnrollError::Detector(e)) => {
                tracing::warn!(error = %e, "enroll: detection failed");
                status.set_outcome(Outcome::danger("Unable to capture face. Try again."));
            }
            Err(EnrollError::Store(e)) => {
                tracing::error!(error = %e, "enroll: failed to persist identity");
                status.set_outcome(Outcome::danger("Could not save face. Try again."));
            }
            Err(EnrollError::StoreTask(e)) => {
                tracing::error!(error = %e, "enroll: store task aborted");
                status.set_outcome(Outcome::danger("Could not save face. Try again."));
            }
        }
    }
}
