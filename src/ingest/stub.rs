//! Synthetic frame source for tests and demos (`stub://` selector).
//!
//! Produces a drifting gradient so successive frames differ and overlay
//! output is visually checkable without a camera.

use anyhow::Result;

use crate::frame::RawFrame;
use crate::ingest::FrameSource;

pub struct StubSource {
    url: String,
    width: u32,
    height: u32,
    frame_count: u64,
    connected: bool,
}

impl StubSource {
    pub fn new(url: String, width: u32, height: u32) -> Self {
        Self {
            url,
            width: width.max(1),
            height: height.max(1),
            frame_count: 0,
            connected: false,
        }
    }
}

impl FrameSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("StubSource: connected to {} (synthetic)", self.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame> {
        self.frame_count += 1;
        let phase = (self.frame_count % 256) as u32;
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push(((x + phase) % 256) as u8);
                pixels.push(((y + phase) % 256) as u8);
                pixels.push((phase % 256) as u8);
            }
        }
        RawFrame::new(pixels, self.width, self.height, self.frame_count)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
