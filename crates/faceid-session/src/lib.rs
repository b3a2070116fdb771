//! faceid-session — Local face authentication session.
//!
//! Owns the periodic detection loop, one-shot enrollment, the manual login
//! fallback and the status surface a host UI renders from.

pub mod config;
pub mod context;
pub mod detection_loop;
pub mod enrollment;
pub mod fallback;
pub mod session;
pub mod status;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use context::SessionContext;
pub use detection_loop::{DetectionLoop, LoopState, TickOutcome};
pub use enrollment::{EnrollError, EnrollResult, Enrollment};
pub use fallback::{manual_login, FallbackError};
pub use session::{Session, SessionError};
pub use status::{BusyGuard, Notice, Outcome, Overlay, Status, StatusKind, StatusSurface, Tone};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`. A no-op if the host
/// already installed one.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
