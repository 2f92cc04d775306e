//! Error taxonomy for the capture loop.
//!
//! The loop branches on error class, so these are typed rather than bare
//! `anyhow` strings:
//!
//! - `SourceUnavailable`: acquisition failed; no session exists afterwards.
//! - `Transport`: network failure or non-success HTTP status; transient,
//!   the session keeps ticking.
//! - `Decode`: malformed detection payload; the offending entry is skipped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// No compatible source granted access (permission denied, no device,
    /// unreachable stream). The caller surfaces a user-facing message and
    /// leaves state unchanged.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Network failure or non-2xx response from the detection endpoint.
    /// Transient: the session stays active and retries next tick.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed detection payload shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl CaptureError {
    /// True for failures the capture loop survives.
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::Transport(_) | CaptureError::Decode(_))
    }
}
