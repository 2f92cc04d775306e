//! HTTP client for the detection service.
//!
//! `HttpDetector` speaks the service's small API:
//! - `POST /detect` with a multipart `image` field carrying a JPEG frame
//! - `GET /clear_results` returning `{"message": ...}`
//! - `GET /download_csv` / `GET /download_json` returning opaque exports
//!
//! The [`Detector`] trait is the seam the capture loop depends on, so tests
//! can script responses without a server.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::detect::result::Detection;
use crate::detect::wire::parse_predictions;
use crate::error::CaptureError;

const MAX_RESPONSE_BYTES: u64 = 16 * 1024 * 1024;

/// Something that turns an encoded frame into detections.
pub trait Detector: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Submit an encoded JPEG frame and return normalized detections.
    fn detect(&mut self, jpeg: &[u8]) -> Result<Vec<Detection>, CaptureError>;
}

/// Server-side export formats, opaque to this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn path(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "/download_csv",
            ExportFormat::Json => "/download_json",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClearResponse {
    message: String,
}

/// Detection client over HTTP.
#[derive(Debug)]
pub struct HttpDetector {
    base: Url,
    agent: ureq::Agent,
}

impl HttpDetector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CaptureError> {
        let base = Url::parse(endpoint)
            .map_err(|e| CaptureError::Transport(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self { base, agent })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CaptureError> {
        self.base
            .join(path)
            .map_err(|e| CaptureError::Transport(format!("invalid endpoint path {}: {}", path, e)))
    }

    /// Ask the service to drop accumulated results. Returns its message.
    pub fn clear_results(&self) -> Result<String, CaptureError> {
        let url = self.endpoint("/clear_results")?;
        let response = self.agent.get(url.as_str()).call().map_err(transport)?;
        let body = read_body(response)?;
        let parsed: ClearResponse = serde_json::from_slice(&body)
            .map_err(|e| CaptureError::Decode(format!("malformed clear_results response: {}", e)))?;
        Ok(parsed.message)
    }

    /// Fetch a server-side export and write it to `dest`. The content is
    /// opaque to this client. The export lands at `dest` whole or not at
    /// all: it is streamed to a sibling temp file and renamed into place.
    pub fn download(&self, format: ExportFormat, dest: &Path) -> Result<u64, CaptureError> {
        let url = self.endpoint(format.path())?;
        let response = self.agent.get(url.as_str()).call().map_err(transport)?;
        let tmp = dest.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp)
            .map_err(|e| CaptureError::Transport(format!("create {}: {}", tmp.display(), e)))?;
        let mut reader = response.into_reader().take(MAX_RESPONSE_BYTES);
        let written = match std::io::copy(&mut reader, &mut file) {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                let _ = std::fs::remove_file(&tmp);
                return Err(CaptureError::Transport(format!(
                    "write {}: {}",
                    dest.display(),
                    e
                )));
            }
        };
        drop(file);
        std::fs::rename(&tmp, dest)
            .map_err(|e| CaptureError::Transport(format!("publish {}: {}", dest.display(), e)))?;
        Ok(written)
    }
}

impl Detector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect(&mut self, jpeg: &[u8]) -> Result<Vec<Detection>, CaptureError> {
        let url = self.endpoint("/detect")?;
        let boundary = format!("gravelcam{:016x}", rand::random::<u64>());
        let body = multipart_image(&boundary, jpeg);
        let response = self
            .agent
            .post(url.as_str())
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(transport)?;
        let body = read_body(response)?;
        parse_predictions(&body)
    }
}

fn transport(err: ureq::Error) -> CaptureError {
    match err {
        ureq::Error::Status(code, response) => {
            let detail = response.into_string().unwrap_or_default();
            CaptureError::Transport(format!("status {}: {}", code, detail.trim()))
        }
        ureq::Error::Transport(t) => CaptureError::Transport(t.to_string()),
    }
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>, CaptureError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut body)
        .map_err(|e| CaptureError::Transport(format!("read response body: {}", e)))?;
    Ok(body)
}

/// Assemble a multipart/form-data body with a single `image` field.
///
/// ureq carries no multipart support, so the body is framed by hand: one
/// part, `filename="frame.jpg"`, `Content-Type: image/jpeg`, closed with the
/// terminal boundary.
fn multipart_image(boundary: &str, jpeg: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(jpeg.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"frame.jpg\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(jpeg);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
