//! Single-subject selection over raw detections.
//!
//! The first detection the network emits decides the outcome: it is taken when its score is
//! strictly above the threshold, otherwise the frame has no subject. Later detections are never
//! examined, even when they would qualify.

use crate::postprocess::{BoundingBox, Detection};

/// Confidence a detection must exceed to be selected.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Return the first detection if it scores above `threshold`.
pub fn select_subject(detections: &[Detection], threshold: f32) -> Option<&Detection> {
    // First-detection-wins: only index 0 is ever examined.
    detections
        .first()
        .filter(|detection| detection.score > threshold)
}

/// Bounding box of the selected subject, if any.
pub fn select_subject_box(detections: &[Detection], threshold: f32) -> Option<BoundingBox> {
    select_subject(detections, threshold).map(|detection| detection.bbox)
}
