//! Wire-shape normalization for detection responses.
//!
//! The service replies with `{ "predictions": [...] }` where each entry is
//! one of:
//!
//! - anchored: `{"bbox": [x, y, w, h], "label": ..., "confidence": ...}`
//!   with the box top-left anchored
//! - centered: `{"x", "y", "width", "height", "class"|"label",
//!   "score"|"confidence"}` with `(x, y)` at the box center
//!
//! Both decode into one canonical [`Detection`]; nothing past this module
//! branches on shape. A malformed entry is skipped with a warning so the
//! remaining detections still render.

use serde::Deserialize;
use serde_json::Value;

use crate::detect::result::Detection;
use crate::error::CaptureError;

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    predictions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrediction {
    Anchored {
        bbox: [f32; 4],
        label: String,
        confidence: f32,
    },
    Centered {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        #[serde(alias = "class")]
        label: String,
        #[serde(alias = "score")]
        confidence: f32,
    },
}

impl RawPrediction {
    fn normalize(self) -> Detection {
        match self {
            RawPrediction::Anchored {
                bbox: [x, y, w, h],
                label,
                confidence,
            } => Detection {
                label,
                confidence,
                x,
                y,
                width: w.max(0.0),
                height: h.max(0.0),
            },
            RawPrediction::Centered {
                x,
                y,
                width,
                height,
                label,
                confidence,
            } => {
                let width = width.max(0.0);
                let height = height.max(0.0);
                Detection {
                    label,
                    confidence,
                    x: x - width / 2.0,
                    y: y - height / 2.0,
                    width,
                    height,
                }
            }
        }
    }
}

/// Parse a detection response body into canonical detections.
///
/// Malformed entries are logged and skipped (per-entry decode failures are
/// not fatal to the response). A body that is not a predictions object at
/// all is a `Decode` error.
pub fn parse_predictions(body: &[u8]) -> Result<Vec<Detection>, CaptureError> {
    let response: DetectResponse = serde_json::from_slice(body)
        .map_err(|e| CaptureError::Decode(format!("malformed detection response: {}", e)))?;

    let mut detections = Vec::with_capacity(response.predictions.len());
    for entry in response.predictions {
        match serde_json::from_value::<RawPrediction>(entry.clone()) {
            Ok(raw) => detections.push(raw.normalize()),
            Err(e) => {
                log::warn!("skipping malformed prediction entry {}: {}", entry, e);
            }
        }
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_shape_passes_through() {
        let body = br#"{"predictions": [{"bbox": [10, 10, 50, 20], "label": "gravel", "confidence": 0.92}]}"#;
        let dets = parse_predictions(body).expect("parse");
        assert_eq!(dets.len(), 1);
        let det = &dets[0];
        assert_eq!((det.x, det.y, det.width, det.height), (10.0, 10.0, 50.0, 20.0));
        assert_eq!(det.caption(), "gravel (92.0%)");
    }

    #[test]
    fn centered_shape_normalizes_to_top_left() {
        let body = br#"{"predictions": [{"x": 100, "y": 100, "width": 40, "height": 40, "class": "rock", "score": 0.5}]}"#;
        let dets = parse_predictions(body).expect("parse");
        assert_eq!(dets.len(), 1);
        let det = &dets[0];
        assert_eq!((det.x, det.y, det.width, det.height), (80.0, 80.0, 40.0, 40.0));
        assert_eq!(det.caption(), "rock (50.0%)");
    }

    #[test]
    fn centered_shape_accepts_label_and_confidence_keys() {
        let body = br#"{"predictions": [{"x": 10, "y": 8, "width": 4, "height": 4, "label": "rock", "confidence": 0.75}]}"#;
        let dets = parse_predictions(body).expect("parse");
        assert_eq!(dets.len(), 1);
        assert_eq!((dets[0].x, dets[0].y), (8.0, 6.0));
    }

    #[test]
    fn negative_size_clamps_to_zero() {
        let body = br#"{"predictions": [{"bbox": [5, 5, -3, 2], "label": "gravel", "confidence": 0.4}]}"#;
        let dets = parse_predictions(body).expect("parse");
        assert_eq!(dets[0].width, 0.0);
        assert_eq!(dets[0].height, 2.0);
    }

    #[test]
    fn malformed_entry_is_skipped_others_survive() {
        let body = br#"{"predictions": [
            {"bogus": true},
            {"bbox": [1, 2, 3, 4], "label": "gravel", "confidence": 0.9}
        ]}"#;
        let dets = parse_predictions(body).expect("parse");
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "gravel");
    }

    #[test]
    fn empty_predictions_yield_no_detections() {
        let dets = parse_predictions(br#"{"predictions": []}"#).expect("parse");
        assert!(dets.is_empty());
    }

    #[test]
    fn missing_predictions_key_yields_no_detections() {
        let dets = parse_predictions(br#"{}"#).expect("parse");
        assert!(dets.is_empty());
    }

    #[test]
    fn non_object_body_is_decode_error() {
        let err = parse_predictions(b"not json").unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }
}
