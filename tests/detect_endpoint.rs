//! HttpDetector against a canned single-request HTTP server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use gravelcam::detect::ExportFormat;
use gravelcam::{CaptureError, Detector, HttpDetector};

/// Serve exactly one request with a fixed response; returns the raw request
/// bytes for inspection.
fn serve_once(status_line: &str, content_type: &str, body: &[u8]) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let status_line = status_line.to_string();
    let content_type = content_type.to_string();
    let body = body.to_vec();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            content_type,
            body.len()
        );
        stream.write_all(response.as_bytes()).expect("write head");
        stream.write_all(&body).expect("write body");
        request
    });

    (addr, handle)
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    // Read headers.
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).expect("read headers");
        if n == 0 {
            return request;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    // Read the body per Content-Length, if any.
    let header_end = request
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
        .unwrap_or(request.len());
    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("read body");
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    request
}

fn detector_for(addr: SocketAddr) -> HttpDetector {
    HttpDetector::new(&format!("http://{}", addr), Duration::from_secs(5)).expect("detector")
}

#[test]
fn detect_posts_multipart_and_parses_both_shapes() {
    let body = br#"{"predictions": [
        {"bbox": [10, 10, 50, 20], "label": "gravel", "confidence": 0.92},
        {"x": 100, "y": 100, "width": 40, "height": 40, "class": "rock", "score": 0.5}
    ]}"#;
    let (addr, server) = serve_once("200 OK", "application/json", body);

    let mut detector = detector_for(addr);
    let detections = detector.detect(b"fake-jpeg-bytes").expect("detect");

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].caption(), "gravel (92.0%)");
    assert_eq!(
        (detections[1].x, detections[1].y, detections[1].width, detections[1].height),
        (80.0, 80.0, 40.0, 40.0)
    );

    let request = server.join().expect("server");
    let text = String::from_utf8_lossy(&request);
    assert!(text.starts_with("POST /detect HTTP/1.1"));
    assert!(text.contains("multipart/form-data; boundary="));
    assert!(text.contains("Content-Disposition: form-data; name=\"image\"; filename=\"frame.jpg\""));
    assert!(text.contains("fake-jpeg-bytes"));
}

#[test]
fn non_success_status_is_transport_error() {
    let (addr, server) = serve_once("500 Internal Server Error", "text/plain", b"boom");

    let mut detector = detector_for(addr);
    let err = detector.detect(b"jpeg").expect_err("should fail");
    assert!(matches!(err, CaptureError::Transport(_)));
    assert!(err.to_string().contains("500"));

    server.join().expect("server");
}

#[test]
fn clear_results_returns_service_message() {
    let (addr, server) = serve_once("200 OK", "application/json", br#"{"message": "results cleared"}"#);

    let detector = detector_for(addr);
    let message = detector.clear_results().expect("clear");
    assert_eq!(message, "results cleared");

    let request = server.join().expect("server");
    assert!(String::from_utf8_lossy(&request).starts_with("GET /clear_results HTTP/1.1"));
}

#[test]
fn download_streams_export_to_file() {
    let export = b"label,confidence\ngravel,0.92\n";
    let (addr, server) = serve_once("200 OK", "text/csv", export);

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("results.csv");
    let detector = detector_for(addr);
    let written = detector.download(ExportFormat::Csv, &dest).expect("download");

    assert_eq!(written, export.len() as u64);
    assert_eq!(std::fs::read(&dest).expect("read export"), export);
    assert!(!dest.with_extension("tmp").exists());

    let request = server.join().expect("server");
    assert!(String::from_utf8_lossy(&request).starts_with("GET /download_csv HTTP/1.1"));
}

/// Serve one request whose Content-Length claims more bytes than are sent,
/// then drop the connection.
fn serve_truncated(body: &[u8], claimed_len: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let body = body.to_vec();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        let _ = read_request(&mut stream);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            claimed_len
        );
        stream.write_all(head.as_bytes()).expect("write head");
        stream.write_all(&body).expect("write body");
        // Connection drops here, short of the declared length.
    });

    addr
}

#[test]
fn interrupted_download_leaves_no_partial_file() {
    let addr = serve_truncated(b"label,confidence\n", 4096);

    let dir = tempfile::tempdir().expect("tempdir");
    let dest = dir.path().join("results.csv");
    let detector = detector_for(addr);
    let err = detector
        .download(ExportFormat::Csv, &dest)
        .expect_err("truncated transfer should fail");

    assert!(matches!(err, CaptureError::Transport(_)));
    // Neither a truncated export nor its temp file may be left behind.
    assert!(!dest.exists());
    assert!(!dest.with_extension("tmp").exists());
}
