//! Status surface consumed by the UI layer.
//!
//! Each piece of presentation state lives in its own `watch` channel so a
//! renderer can subscribe to exactly what it draws. One-off notices (toasts)
//! go through a `broadcast` channel instead since they are events, not state.

use faceid_core::BoundingBox;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Loading,
    Ready,
    Error,
}

/// Session-level status line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Success,
    Danger,
}

/// Latest authentication or enrollment outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub message: String,
    pub tone: Tone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl Outcome {
    fn plain(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
            name: None,
            distance: None,
        }
    }

    pub fn neutral(message: impl Into<String>) -> Self {
        Self::plain(message, Tone::Neutral)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::plain(message, Tone::Success)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::plain(message, Tone::Danger)
    }

    pub fn no_face() -> Self {
        Self::neutral("No face detected. Center your face.")
    }

    pub fn granted(name: &str, distance: f32) -> Self {
        Self {
            message: format!("Access granted · Welcome {name} ({distance:.2})"),
            tone: Tone::Success,
            name: Some(name.to_string()),
            distance: Some(distance),
        }
    }

    pub fn denied(distance: f32) -> Self {
        Self {
            message: "Access denied · Face not recognized".to_string(),
            tone: Tone::Danger,
            name: None,
            distance: Some(distance),
        }
    }
}

/// What the overlay canvas should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Overlay {
    Cleared,
    Box { region: BoundingBox, tone: Tone },
}

/// Transient message, shown for `ttl`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub ttl: Duration,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    status: &'a Status,
    outcome: &'a Outcome,
    overlay: &'a Overlay,
    busy: bool,
}

/// Keeps the loader visible while alive.
pub struct BusyGuard<'a>(&'a watch::Sender<usize>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct StatusSurface {
    status: watch::Sender<Status>,
    outcome: watch::Sender<Outcome>,
    overlay: watch::Sender<Overlay>,
    /// Detector calls currently in progress.
    busy: watch::Sender<usize>,
    notices: broadcast::Sender<Notice>,
    notice_ttl: Duration,
}

impl StatusSurface {
    pub fn new(notice_ttl: Duration) -> Self {
        let (status, _) = watch::channel(Status {
            kind: StatusKind::Loading,
            message: "Starting…".to_string(),
        });
        let (outcome, _) = watch::channel(Outcome::neutral("Waiting for camera."));
        let (overlay, _) = watch::channel(Overlay::Cleared);
        let (busy, _) = watch::channel(0usize);
        let (notices, _) = broadcast::channel(16);
        Self {
            status,
            outcome,
            overlay,
            busy,
            notices,
            notice_ttl,
        }
    }

    pub fn set_status(&self, kind: StatusKind, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?kind, %message, "status");
        self.status.send_replace(Status { kind, message });
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        self.outcome.send_replace(outcome);
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome.borrow().clone()
    }

    pub fn subscribe_outcome(&self) -> watch::Receiver<Outcome> {
        self.outcome.subscribe()
    }

    pub fn clear_overlay(&self) {
        self.overlay.send_replace(Overlay::Cleared);
    }

    pub fn draw_box(&self, region: BoundingBox, tone: Tone) {
        self.overlay.send_replace(Overlay::Box { region, tone });
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay.borrow().clone()
    }

    pub fn subscribe_overlay(&self) -> watch::Receiver<Overlay> {
        self.overlay.subscribe()
    }

    /// Show the loader until the returned guard drops. Overlapping callers
    /// each hold their own guard; the loader clears when the last one ends.
    pub fn busy(&self) -> BusyGuard<'_> {
        self.busy.send_modify(|n| *n += 1);
        BusyGuard(&self.busy)
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow() > 0
    }

    /// Publish a notice. Dropped silently if nobody is listening.
    pub fn notify(&self, message: impl Into<String>) {
        let notice = Notice {
            message: message.into(),
            ttl: self.notice_ttl,
        };
        tracing::debug!(message = %notice.message, "notice");
        let _ = self.notices.send(notice);
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Current presentation state as JSON.
    pub fn snapshot_json(&self) -> String {
        let status = self.status.borrow().clone();
        let outcome = self.outcome.borrow().clone();
        let overlay = self.overlay.borrow().clone();
        serde_json::to_string(&Snapshot {
            status: &status,
            outcome: &outcome,
            overlay: &overlay,
            busy: self.is_busy(),
        })
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to serialize status snapshot");
            "{}".to_string()
        })
    }
}
