//! Config layering: file, env overrides, validation.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use gravelcam::CaptureConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GRAVELCAM_CONFIG",
        "GRAVELCAM_ENDPOINT",
        "GRAVELCAM_SOURCE_URL",
        "GRAVELCAM_INTERVAL_MS",
        "GRAVELCAM_MAX_DIM",
        "GRAVELCAM_OUTPUT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = CaptureConfig::load().expect("load");
    assert_eq!(cfg.endpoint, "http://127.0.0.1:5000");
    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.interval, Duration::from_millis(1500));
    assert_eq!(cfg.encode.max_dim, 800);
    assert_eq!(cfg.encode.jpeg_quality, 80);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "endpoint": "http://detector.local:8080",
        "interval_ms": 500,
        "timeout_secs": 3,
        "source": {
            "url": "http://camera.local:81/stream",
            "target_fps": 5,
            "width": 320,
            "height": 240
        },
        "encode": {
            "max_dim": 640,
            "jpeg_quality": 70
        },
        "output": "frames/current.jpg"
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("GRAVELCAM_CONFIG", file.path());
    std::env::set_var("GRAVELCAM_INTERVAL_MS", "250");
    std::env::set_var("GRAVELCAM_MAX_DIM", "480");

    let cfg = CaptureConfig::load().expect("load config");

    assert_eq!(cfg.endpoint, "http://detector.local:8080");
    assert_eq!(cfg.timeout, Duration::from_secs(3));
    assert_eq!(cfg.source.url, "http://camera.local:81/stream");
    assert_eq!(cfg.source.target_fps, 5);
    assert_eq!((cfg.source.width, cfg.source.height), (320, 240));
    assert_eq!(cfg.encode.jpeg_quality, 70);
    assert_eq!(cfg.output, std::path::PathBuf::from("frames/current.jpg"));
    // Env wins over file.
    assert_eq!(cfg.interval, Duration::from_millis(250));
    assert_eq!(cfg.encode.max_dim, 480);

    clear_env();
}

#[test]
fn zero_interval_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GRAVELCAM_INTERVAL_MS", "0");
    let err = CaptureConfig::load().expect_err("should reject");
    assert!(err.to_string().contains("interval"));
    clear_env();
}

#[test]
fn invalid_endpoint_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GRAVELCAM_ENDPOINT", "not a url");
    let err = CaptureConfig::load().expect_err("should reject");
    assert!(err.to_string().contains("endpoint"));
    clear_env();
}

#[test]
fn invalid_jpeg_quality_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"encode": {"jpeg_quality": 0}}"#)
        .expect("write config");
    std::env::set_var("GRAVELCAM_CONFIG", file.path());

    let err = CaptureConfig::load().expect_err("should reject");
    assert!(err.to_string().contains("jpeg_quality"));
    clear_env();
}
