//! Still image source.
//!
//! Wraps a single local image file (the "uploaded image" path of the demo).
//! The file is decoded once at connect time and the same frame is replayed
//! on each call, so one-shot callers take the first frame and loop callers
//! get a stable picture.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use crate::frame::RawFrame;
use crate::ingest::FrameSource;

pub struct StillSource {
    path: PathBuf,
    frame: Option<RawFrame>,
    served: u64,
}

impl StillSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            frame: None,
            served: 0,
        }
    }
}

impl FrameSource for StillSource {
    fn connect(&mut self) -> Result<()> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read image file {}", self.path.display()))?;
        let frame = RawFrame::decode(&bytes, 0)
            .with_context(|| format!("decode image file {}", self.path.display()))?;
        log::info!(
            "StillSource: loaded {} ({}x{})",
            self.path.display(),
            frame.width,
            frame.height
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| anyhow!("still source not connected; call connect() first"))?;
        self.served += 1;
        let mut frame = frame.clone();
        frame.seq = self.served;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.frame.is_some()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeSettings;
    use std::io::Write;

    #[test]
    fn connect_fails_for_missing_file() {
        let mut source = StillSource::new("does-not-exist.jpg".into());
        assert!(source.connect().is_err());
        assert!(!source.is_healthy());
    }

    #[test]
    fn replays_the_same_frame() -> Result<()> {
        let frame = RawFrame::new(vec![90u8; 16 * 16 * 3], 16, 16, 0)?;
        let jpeg = frame.encode_jpeg(&EncodeSettings {
            max_dim: 800,
            jpeg_quality: 90,
        })?;
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&jpeg)?;

        let mut source = StillSource::new(file.path().into());
        source.connect()?;
        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_eq!(a.pixels(), b.pixels());
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        Ok(())
    }
}
