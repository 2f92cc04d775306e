//! Frame ingestion sources.
//!
//! This module provides the sources the capture loop samples from:
//! - HTTP camera streams (MJPEG multipart or single-JPEG snapshot URLs)
//! - Still images (a single local file, replayed each tick)
//! - Stub source (synthetic frames for tests and demos)
//!
//! All sources produce [`RawFrame`] instances and share the same surface:
//! `connect`, `next_frame`, `is_healthy`, `describe`. Acquisition failures
//! are reported by `connect`; the capture loop maps them to
//! `SourceUnavailable` and releases the source before returning.

use anyhow::{anyhow, Result};

pub mod http;
pub mod still;
pub mod stub;

pub use http::HttpSource;
pub use still::StillSource;
pub use stub::StubSource;

use crate::config::SourceSettings;
use crate::frame::RawFrame;

/// A live video source or a one-shot image.
pub trait FrameSource: Send {
    /// Acquire the source. Must be called before `next_frame`.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<RawFrame>;

    /// True while the source is producing frames at a plausible rate.
    fn is_healthy(&self) -> bool;

    /// Human-readable selector for logs.
    fn describe(&self) -> String;
}

/// Map a selector string onto a source.
///
/// - `http://` / `https://` -> [`HttpSource`]
/// - `stub://` -> [`StubSource`]
/// - anything else -> [`StillSource`] over a local file path
pub fn open_source(selector: &str, settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    if selector.starts_with("http://") || selector.starts_with("https://") {
        Ok(Box::new(HttpSource::new(
            selector.to_string(),
            settings.target_fps,
        )?))
    } else if selector.starts_with("stub://") {
        Ok(Box::new(StubSource::new(
            selector.to_string(),
            settings.width,
            settings.height,
        )))
    } else if selector.contains("://") {
        Err(anyhow!(
            "unsupported source scheme in '{}'; expected http(s), stub, or a local path",
            selector
        ))
    } else {
        Ok(Box::new(StillSource::new(selector.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SourceSettings {
        SourceSettings {
            url: String::new(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn selector_dispatch() -> Result<()> {
        let stub = open_source("stub://camera", &settings())?;
        assert!(stub.describe().starts_with("stub://"));

        let http = open_source("http://10.0.0.2:81/stream", &settings())?;
        assert!(http.describe().contains("10.0.0.2"));

        let still = open_source("shot.jpg", &settings())?;
        assert!(still.describe().contains("shot.jpg"));
        Ok(())
    }

    #[test]
    fn unknown_scheme_rejected() {
        assert!(open_source("rtsp://cam/stream", &settings()).is_err());
    }
}
