//! Detection wire handling and the HTTP client.
//!
//! The backend returns predictions in one of two shapes; `wire` normalizes
//! both into the canonical [`Detection`] at the API boundary. `client`
//! implements the [`Detector`] seam over the remote service.

pub mod client;
pub mod result;
pub mod wire;

pub use client::{Detector, ExportFormat, HttpDetector};
pub use result::Detection;
pub use wire::parse_predictions;
