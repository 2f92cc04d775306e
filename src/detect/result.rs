/// One recognized object: label, confidence, top-left-anchored box.
///
/// Invariant: after wire normalization every detection is top-left anchored
/// with non-negative width and height.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Detection {
    /// Overlay caption, e.g. `gravel (92.0%)`.
    pub fn caption(&self) -> String {
        format!("{} ({:.1}%)", self.label, self.confidence * 100.0)
    }
}
