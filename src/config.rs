use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_INTERVAL_MS: u64 = 1500;
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_MAX_DIM: u32 = 800;
const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OUTPUT: &str = "latest.jpg";

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    endpoint: Option<String>,
    interval_ms: Option<u64>,
    timeout_secs: Option<u64>,
    source: Option<SourceConfigFile>,
    encode: Option<EncodeConfigFile>,
    output: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct EncodeConfigFile {
    max_dim: Option<u32>,
    jpeg_quality: Option<u8>,
}

/// Resolved configuration for the capture loop and detection client.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Base URL of the detection service.
    pub endpoint: String,
    /// Tick cadence for the capture loop.
    pub interval: Duration,
    /// Request timeout for detection calls.
    pub timeout: Duration,
    pub source: SourceSettings,
    pub encode: EncodeSettings,
    /// Where the rendered output frame is written.
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Source selector: http(s):// stream, stub://, or a local image path.
    pub url: String,
    /// Target frame rate for streaming sources (decimation, not a guarantee).
    pub target_fps: u32,
    /// Dimensions for synthetic frames.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Frames whose larger dimension exceeds this are downscaled before
    /// encoding, trading resolution for transfer latency.
    pub max_dim: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::from_file(CaptureConfigFile::default())
    }
}

impl CaptureConfig {
    /// Load configuration: JSON file pointed at by `GRAVELCAM_CONFIG` (if
    /// set), then env overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GRAVELCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => CaptureConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let source = SourceSettings {
            url: file
                .source
                .as_ref()
                .and_then(|s| s.url.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|s| s.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|s| s.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|s| s.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };
        let encode = EncodeSettings {
            max_dim: file
                .encode
                .as_ref()
                .and_then(|e| e.max_dim)
                .unwrap_or(DEFAULT_MAX_DIM),
            jpeg_quality: file
                .encode
                .as_ref()
                .and_then(|e| e.jpeg_quality)
                .unwrap_or(DEFAULT_JPEG_QUALITY),
        };
        Self {
            endpoint: file
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            interval: Duration::from_millis(file.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            source,
            encode,
            output: PathBuf::from(file.output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string())),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("GRAVELCAM_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(url) = std::env::var("GRAVELCAM_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(interval) = std::env::var("GRAVELCAM_INTERVAL_MS") {
            let ms: u64 = interval.parse().map_err(|_| {
                anyhow!("GRAVELCAM_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.interval = Duration::from_millis(ms);
        }
        if let Ok(max_dim) = std::env::var("GRAVELCAM_MAX_DIM") {
            let dim: u32 = max_dim
                .parse()
                .map_err(|_| anyhow!("GRAVELCAM_MAX_DIM must be an integer number of pixels"))?;
            self.encode.max_dim = dim;
        }
        if let Ok(output) = std::env::var("GRAVELCAM_OUTPUT") {
            if !output.trim().is_empty() {
                self.output = PathBuf::from(output);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.endpoint)
            .map_err(|e| anyhow!("invalid endpoint url {}: {}", self.endpoint, e))?;
        if self.interval.as_millis() == 0 {
            return Err(anyhow!("interval must be greater than zero"));
        }
        if self.encode.max_dim == 0 {
            return Err(anyhow!("encode.max_dim must be greater than zero"));
        }
        if self.encode.jpeg_quality == 0 || self.encode.jpeg_quality > 100 {
            return Err(anyhow!("encode.jpeg_quality must be in 1..=100"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
