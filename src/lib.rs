//! gravelcam - headless client for a remote object-detection demo service.
//!
//! The crate drives a `sample -> detect -> render` loop against a detection
//! HTTP endpoint:
//!
//! - `ingest`: frame sources (HTTP camera streams, still images, stub)
//! - `frame`: decoded RGB frames and JPEG encoding with downscale
//! - `detect`: wire-shape normalization and the detection HTTP client
//! - `render`: bounding box + label overlays and output surfaces
//! - `capture`: the session-owned tick loop tying the above together
//!
//! All session state lives in an explicit [`CaptureSession`] value owned by
//! the caller; there is no module-level mutable state. Detection responses
//! are normalized into one canonical [`Detection`] shape at the API boundary
//! and nothing downstream branches on wire format.

pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod render;

pub use capture::{CaptureLoop, CaptureSession, SessionSnapshot};
pub use config::CaptureConfig;
pub use detect::{Detection, Detector, HttpDetector};
pub use error::CaptureError;
pub use frame::RawFrame;
pub use ingest::{open_source, FrameSource};
pub use render::{FileSurface, Surface};
