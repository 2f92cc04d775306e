//! HTTP camera source.
//!
//! Ingests frames from cameras that expose either a multipart MJPEG stream
//! or a single-JPEG snapshot URL. The content type of the first response
//! decides which mode is used. Frames are decimated to the configured
//! target rate.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use crate::frame::RawFrame;
use crate::ingest::FrameSource;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// HTTP MJPEG/snapshot frame source.
pub struct HttpSource {
    url: String,
    target_fps: u32,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    frame_count: u64,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    Snapshot,
}

impl HttpSource {
    pub fn new(url: String, target_fps: u32) -> Result<Self> {
        url::Url::parse(&url).with_context(|| format!("parse source url {}", url))?;
        Ok(Self {
            url,
            target_fps,
            stream: None,
            last_frame_at: None,
            connected_at: None,
            frame_count: 0,
        })
    }
}

impl FrameSource for HttpSource {
    fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.url)
            .call()
            .with_context(|| format!("connect to camera stream {}", self.url))?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
        } else {
            self.stream = Some(HttpStream::Snapshot);
        }
        self.connected_at = Some(Instant::now());
        log::info!("HttpSource: connected to {}", self.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http source not connected; call connect() first"))?;
        let min_interval = frame_interval(self.target_fps);
        loop {
            let jpeg_bytes = match stream {
                HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
                HttpStream::Snapshot => {
                    // Sleep out the decimation window before polling again;
                    // re-fetching inside it would hammer the camera.
                    if let Some(last) = self.last_frame_at {
                        let since = last.elapsed();
                        if since < min_interval {
                            std::thread::sleep(min_interval - since);
                        }
                    }
                    fetch_snapshot(&self.url)
                }
            }?;

            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }

            self.frame_count += 1;
            self.last_frame_at = Some(now);
            return RawFrame::decode(&jpeg_bytes, self.frame_count);
        }
    }

    fn is_healthy(&self) -> bool {
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= health_grace(self.target_fps)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_snapshot(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    Ok(bytes)
}

fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

fn health_grace(target_fps: u32) -> Duration {
    let base_ms = if target_fps == 0 {
        2_000
    } else {
        (1000 / target_fps).saturating_mul(6)
    };
    Duration::from_millis(base_ms.max(2_000) as u64)
}
