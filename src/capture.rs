//! The capture loop: sample -> detect -> render.
//!
//! All loop state lives in a [`CaptureSession`] owned by the caller. The
//! session drives a worker thread at the configured tick cadence:
//! sample a frame, encode it, submit it to the detector, draw overlays,
//! present. Transport failures are transient (notice + unannotated frame,
//! keep ticking); repeated source failures idle the session.
//!
//! `stop` flips the liveness flag immediately. A detect call already in
//! flight completes, but its result is checked against the flag and
//! discarded before rendering.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::CaptureConfig;
use crate::detect::result::Detection;
use crate::detect::Detector;
use crate::error::CaptureError;
use crate::ingest::{open_source, FrameSource};
use crate::render::{annotate, Surface};

/// Consecutive sample failures tolerated before the session goes idle.
const MAX_SOURCE_FAILURES: u32 = 3;
/// Stop-responsiveness granularity while waiting out the tick interval.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

#[derive(Default)]
struct SessionState {
    ticks: u64,
    last_detections: Vec<Detection>,
    last_error: Option<String>,
}

/// Point-in-time view of a running session, for callers and tests.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub active: bool,
    pub ticks: u64,
    pub last_detections: Vec<Detection>,
    pub last_error: Option<String>,
}

/// Live capture state: source handle, worker, last-rendered detections.
/// Created by [`CaptureLoop::start`], destroyed by [`CaptureSession::stop`]
/// (or drop). Never persisted.
pub struct CaptureSession {
    live: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    state: Arc<Mutex<SessionState>>,
}

impl CaptureSession {
    /// True while the worker is ticking.
    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stop sampling. Idempotent: safe to call when already stopped.
    /// The tick loop cancels immediately; an in-flight detect completes
    /// and its result is discarded.
    pub fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("capture worker panicked");
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        SessionSnapshot {
            active: self.is_active(),
            ticks: state.ticks,
            last_detections: state.last_detections.clone(),
            last_error: state.last_error.clone(),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CaptureLoop;

impl CaptureLoop {
    /// Acquire the source named by `selector` and begin periodic sampling.
    ///
    /// Fails with [`CaptureError::SourceUnavailable`] when the source cannot
    /// be acquired; the partially acquired source is released before the
    /// error returns and no session is left dangling.
    pub fn start(
        config: &CaptureConfig,
        selector: &str,
        detector: Box<dyn Detector>,
        surface: Box<dyn Surface>,
    ) -> Result<CaptureSession, CaptureError> {
        let source = open_source(selector, &config.source)
            .map_err(|e| CaptureError::SourceUnavailable(e.to_string()))?;
        Self::start_with(config, source, detector, surface)
    }

    /// Like [`CaptureLoop::start`] but with an already-built source.
    pub fn start_with(
        config: &CaptureConfig,
        mut source: Box<dyn FrameSource>,
        mut detector: Box<dyn Detector>,
        mut surface: Box<dyn Surface>,
    ) -> Result<CaptureSession, CaptureError> {
        if let Err(e) = source.connect() {
            // `source` drops here, releasing anything it acquired.
            return Err(CaptureError::SourceUnavailable(e.to_string()));
        }
        log::info!(
            "capture started: source={} detector={} interval={}ms",
            source.describe(),
            detector.name(),
            config.interval.as_millis()
        );

        let live = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SessionState::default()));
        let interval = config.interval;
        let encode = config.encode.clone();

        let worker = {
            let live = Arc::clone(&live);
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                let mut source_failures = 0u32;
                while live.load(Ordering::SeqCst) {
                    let tick_started = Instant::now();

                    let frame = match source.next_frame() {
                        Ok(frame) => {
                            source_failures = 0;
                            frame
                        }
                        Err(e) => {
                            source_failures += 1;
                            log::warn!(
                                "frame sample failed ({}/{}): {}",
                                source_failures,
                                MAX_SOURCE_FAILURES,
                                e
                            );
                            if source_failures >= MAX_SOURCE_FAILURES {
                                log::error!("source lost, stopping capture: {}", e);
                                live.store(false, Ordering::SeqCst);
                                break;
                            }
                            wait_tick(&live, interval, tick_started);
                            continue;
                        }
                    };

                    let jpeg = match frame.encode_jpeg(&encode) {
                        Ok(jpeg) => jpeg,
                        Err(e) => {
                            log::warn!("frame encode failed: {}", e);
                            wait_tick(&live, interval, tick_started);
                            continue;
                        }
                    };

                    match detector.detect(&jpeg) {
                        Ok(detections) => {
                            // stop() during the round-trip: discard the result.
                            if !live.load(Ordering::SeqCst) {
                                break;
                            }
                            let mut image = frame.to_image();
                            annotate(&mut image, &detections);
                            if let Err(e) = surface.present(&image) {
                                log::warn!("present failed: {}", e);
                            }
                            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                            state.ticks += 1;
                            state.last_detections = detections;
                            state.last_error = None;
                        }
                        Err(e) if e.is_transient() => {
                            if !live.load(Ordering::SeqCst) {
                                break;
                            }
                            surface.notice(&format!("detection unavailable: {}", e));
                            if let Err(e) = surface.present(&frame.to_image()) {
                                log::warn!("present failed: {}", e);
                            }
                            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                            state.ticks += 1;
                            state.last_error = Some(e.to_string());
                        }
                        Err(e) => {
                            log::warn!("detector error: {}", e);
                        }
                    }

                    wait_tick(&live, interval, tick_started);
                }
            })
        };

        Ok(CaptureSession {
            live,
            worker: Some(worker),
            state,
        })
    }
}

/// Sleep out the remainder of the tick, waking early when the session stops.
fn wait_tick(live: &AtomicBool, interval: Duration, tick_started: Instant) {
    loop {
        if !live.load(Ordering::SeqCst) {
            return;
        }
        let elapsed = tick_started.elapsed();
        if elapsed >= interval {
            return;
        }
        std::thread::sleep(SLEEP_SLICE.min(interval - elapsed));
    }
}
