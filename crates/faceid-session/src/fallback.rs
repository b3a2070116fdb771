//! Manual credential entry for sessions without a usable camera.
//!
//! Credentials are only checked for presence; verifying them is the job of
//! whatever account system the host plugs in behind this form.

use crate::status::{Outcome, StatusSurface};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FallbackError {
    #[error("email and password are required")]
    MissingCredentials,
}

/// Accepts any non-empty email and password. Missing fields leave the
/// status surface untouched; the form itself marks required inputs.
pub fn manual_login(status: &StatusSurface, email: &str, password: &str) -> Result<(), FallbackError> {
    if email.is_empty() || password.is_empty() {
        return Err(FallbackError::MissingCredentials);
    }

    tracing::info!("manual login accepted");
    status.set_outcome(Outcome::success("Manual access granted (fallback)."));
    status.notify("Logged in manually.");
    Ok(())
}
