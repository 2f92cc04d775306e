//! gravelcam - capture frames, detect objects remotely, render overlays.
//!
//! Subcommands:
//! - `watch`: run the capture loop against the configured source until Ctrl-C
//! - `upload`: one-shot detection over a local image
//! - `clear`: ask the service to drop accumulated results
//! - `download`: fetch the service's CSV/JSON export

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gravelcam::detect::ExportFormat;
use gravelcam::render::annotate;
use gravelcam::{CaptureConfig, CaptureLoop, Detector, FileSurface, HttpDetector, RawFrame};

#[derive(Parser)]
#[command(name = "gravelcam", version, about = "Client for a remote object-detection service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample the configured source periodically and render detections.
    Watch {
        /// Source selector: http(s):// stream, stub://, or an image path.
        /// Overrides the configured source.
        #[arg(long, env = "GRAVELCAM_SOURCE_URL")]
        source: Option<String>,
    },
    /// Detect objects in a single local image.
    Upload {
        /// Image file to submit.
        path: PathBuf,
        /// Where to write the annotated copy (default: alongside the input).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Clear accumulated results on the service.
    Clear,
    /// Download the service's result export.
    Download {
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Destination file.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Csv => ExportFormat::Csv,
            Format::Json => ExportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = CaptureConfig::load()?;

    match cli.command {
        Command::Watch { source } => watch(&config, source),
        Command::Upload { path, out } => upload(&config, &path, out),
        Command::Clear => {
            let detector = HttpDetector::new(&config.endpoint, config.timeout)?;
            let message = detector.clear_results()?;
            println!("{}", message);
            Ok(())
        }
        Command::Download { format, out } => {
            let detector = HttpDetector::new(&config.endpoint, config.timeout)?;
            let written = detector.download(format.into(), &out)?;
            println!("wrote {} bytes to {}", written, out.display());
            Ok(())
        }
    }
}

fn watch(config: &CaptureConfig, source: Option<String>) -> Result<()> {
    let selector = source.unwrap_or_else(|| config.source.url.clone());
    let detector = HttpDetector::new(&config.endpoint, config.timeout)?;
    let surface = FileSurface::new(config.output.clone(), config.encode.jpeg_quality);

    let mut session = CaptureLoop::start(config, &selector, Box::new(detector), Box::new(surface))?;
    log::info!("rendering to {}", config.output.display());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install ctrl-c handler")?;
    }

    let mut last_ticks = 0u64;
    while running.load(Ordering::SeqCst) && session.is_active() {
        std::thread::sleep(Duration::from_millis(200));
        let snapshot = session.snapshot();
        if snapshot.ticks != last_ticks {
            last_ticks = snapshot.ticks;
            match &snapshot.last_error {
                Some(err) => log::info!("tick {}: {}", snapshot.ticks, err),
                None => log::info!(
                    "tick {}: {} detection(s)",
                    snapshot.ticks,
                    snapshot.last_detections.len()
                ),
            }
        }
    }

    session.stop();
    log::info!("capture stopped");
    Ok(())
}

fn upload(config: &CaptureConfig, path: &Path, out: Option<PathBuf>) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    let frame = RawFrame::decode(&bytes, 0)?;
    let jpeg = frame.encode_jpeg(&config.encode)?;

    let mut detector = HttpDetector::new(&config.endpoint, config.timeout)?;
    let detections = detector.detect(&jpeg)?;

    if detections.is_empty() {
        println!("No objects detected in this image.");
        return Ok(());
    }

    println!("Detection results:");
    for det in &detections {
        println!("  {}: {:.1}% confidence", det.label, det.confidence * 100.0);
    }

    let out = out.unwrap_or_else(|| path.with_extension("annotated.jpg"));
    let mut image = frame.to_image();
    annotate(&mut image, &detections);
    image
        .save(&out)
        .with_context(|| format!("save annotated image {}", out.display()))?;
    println!("annotated image written to {}", out.display());
    Ok(())
}
