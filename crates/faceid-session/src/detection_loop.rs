//! Continuous detection: a fixed-interval timer driving detect → match → report.
//!
//! State machine: `Idle → Running ⇄ Suspended`. `start()` replaces any
//! running timer, so at most one is ever active. Each timer awaits its tick
//! inline, which serializes ticks of one timer; the in-flight flag covers
//! the overlap between an old timer's last tick and a new timer after a
//! restart, as well as manual [`DetectionLoop::tick`] calls.
//!
//! Every `start()`/`stop()` bumps a generation counter. A tick captures the
//! generation it was started under and drops its result if the counter
//! moved while the detector was running, so a late result never overwrites
//! the UI of a suspended loop.

use crate::context::SessionContext;
use crate::status::{Outcome, Tone};
use faceid_core::{DetectionOutcome, DetectorOptions, MatchResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Running,
    Suspended,
}

/// What a single tick did. Returned for callers and tests; the UI learns
/// about it through the status surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Models still loading; nothing attempted.
    ModelsLoading,
    /// No live frame source attached; nothing attempted.
    NoFrameSource,
    /// Another detection was still running.
    InFlight,
    /// The frame source failed to deliver a frame.
    FrameUnavailable,
    /// The detector call failed; the loop keeps polling.
    DetectorFailed,
    /// Result arrived after the loop was stopped or restarted.
    Discarded,
    NoFace,
    Granted { name: String, distance: f32 },
    Denied { distance: f32 },
}

#[derive(Clone)]
pub struct DetectionLoop {
    inner: Arc<LoopInner>,
}

struct LoopInner {
    ctx: Arc<SessionContext>,
    state: watch::Sender<LoopState>,
    /// Dropping the sender stops the timer task it belongs to.
    timer: Mutex<Option<watch::Sender<()>>>,
    generation: AtomicU64,
    in_flight: AtomicBool,
    /// Runtime the timers are spawned on, captured on first use so hosts
    /// can drive lifecycle changes from their own threads.
    runtime: Mutex<Option<Handle>>,
}

/// Clears the in-flight flag when the tick finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DetectionLoop {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            inner: Arc::new(LoopInner {
                ctx,
                state,
                timer: Mutex::new(None),
                generation: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
                runtime: Mutex::new(Handle::try_current().ok()),
            }),
        }
    }

    pub fn state(&self) -> LoopState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.inner.state.subscribe()
    }

    /// Enter `Running` and (re)arm the timer. The first tick fires one
    /// interval from now.
    ///
    /// May be called from any thread once the loop has seen a tokio runtime,
    /// either at construction or on an earlier `start()`. Without one the
    /// call is logged and the state is left unchanged.
    pub fn start(&self) {
        let Some(runtime) = self.runtime() else {
            tracing::error!("no tokio runtime bound; detection loop not started");
            return;
        };
        // tokio intervals reject a zero period.
        let period = self.inner.ctx.config().detection_interval.max(Duration::from_millis(1));
        let mut timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);

        // Replacing the sender stops the previous timer before its next tick.
        let (stop_tx, stop_rx) = watch::channel(());
        let replaced = timer.replace(stop_tx).is_some();
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.state.send_replace(LoopState::Running);

        runtime.spawn(run_timer(Arc::downgrade(&self.inner), generation, period, stop_rx));
        tracing::debug!(generation, replaced, period_ms = period.as_millis() as u64, "detection loop started");
    }

    fn runtime(&self) -> Option<Handle> {
        let mut slot = self.inner.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Handle::try_current().ok();
        }
        slot.clone()
    }

    /// Suspend the loop. Safe to call repeatedly.
    ///
    /// An in-flight detection is left to finish; its result is discarded.
    pub fn stop(&self) {
        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_none() {
            return;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.state.send_if_modified(|state| {
            if *state == LoopState::Running {
                *state = LoopState::Suspended;
                true
            } else {
                false
            }
        });
        tracing::debug!(generation, "detection loop suspended");
    }

    /// Run one tick now under the current generation.
    pub async fn tick(&self) -> TickOutcome {
        let generation = self.inner.generation.load(Ordering::Acquire);
        self.run_tick(generation).await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::Acquire) == generation
            && self.state() == LoopState::Running
    }

    async fn run_tick(&self, generation: u64) -> TickOutcome {
        let ctx = &self.inner.ctx;

        if !self.is_current(generation) {
            return TickOutcome::Discarded;
        }
        if !ctx.models_ready() {
            return TickOutcome::ModelsLoading;
        }
        let Some(source) = ctx.frame_source() else {
            return TickOutcome::NoFrameSource;
        };
        let Some(_guard) = InFlight::acquire(&self.inner.in_flight) else {
            tracing::trace!(generation, "previous detection still in flight; skipping tick");
            return TickOutcome::InFlight;
        };

        let frame = match source.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "frame unavailable; skipping tick");
                return TickOutcome::FrameUnavailable;
            }
        };

        let options = DetectorOptions::new(ctx.config().loop_score_threshold);
        let detected = {
            let _busy = ctx.status().busy();
            ctx.detector().detect_single_face(&frame, options).await
        };

        if !self.is_current(generation) {
            tracing::debug!(generation, "discarding detection that resolved after stop");
            return TickOutcome::Discarded;
        }

        let detection = match detected {
            Ok(DetectionOutcome::Face(detection)) => detection,
            Ok(DetectionOutcome::NoFace) => {
                ctx.status().clear_overlay();
                ctx.status().set_outcome(Outcome::no_face());
                return TickOutcome::NoFace;
            }
            Err(e) => {
                tracing::warn!(error = %e, "detection failed; will retry next tick");
                ctx.status().clear_overlay();
                ctx.status().set_outcome(Outcome::neutral("Detection unavailable. Retrying…"));
                return TickOutcome::DetectorFailed;
            }
        };

        let detection = detection.resize(frame.dimensions(), ctx.display_dimensions());
        let result = match ctx.best_match(&detection.descriptor).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "probe descriptor incompatible with enrolled identities");
                MatchResult::no_match()
            }
        };

        if !self.is_current(generation) {
            return TickOutcome::Discarded;
        }

        let threshold = ctx.threshold();
        let accepted = threshold.accepts(&result);
        match result.identity {
            Some(identity) if accepted => {
                tracing::info!(name = %identity.name, distance = result.distance, "access granted");
                ctx.status().set_outcome(Outcome::granted(&identity.name, result.distance));
                ctx.status().draw_box(detection.region, Tone::Success);
                TickOutcome::Granted {
                    name: identity.name,
                    distance: result.distance,
                }
            }
            _ => {
                tracing::debug!(distance = result.distance, threshold = threshold.value(), "access denied");
                ctx.status().set_outcome(Outcome::denied(result.distance));
                ctx.status().draw_box(detection.region, Tone::Danger);
                TickOutcome::Denied {
                    distance: result.distance,
                }
            }
        }
    }
}

async fn run_timer(
    inner: Weak<LoopInner>,
    generation: u64,
    period: Duration,
    mut stop: watch::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Only ever errors: the sender is dropped, never sent on.
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        DetectionLoop { inner }.run_tick(generation).await;
    }

    tracing::trace!(generation, "detection timer exited");
}
