//! Core MobileNet-SSD primitives.
//!
//! This crate loads the detector ONNX graph, runs inference with `tract-onnx`, selects a single
//! subject per frame and prepares square, mirrored crops of it.

/// Crop, square padding and mirroring.
pub mod cropper;
/// High-level detector and the trait the dataset walker drives.
pub mod detector;
/// ONNX model loading and execution.
pub mod model;
/// Decoding of raw SSD output rows.
pub mod postprocess;
/// Image pre-processing (resizing, tensor conversion).
pub mod preprocess;
/// First-detection-wins subject selection.
pub mod selector;

pub use cropper::{crop_to_box, mirror, pad_to_square, prepare_subject};
pub use detector::{SsdDetector, SubjectDetector};
pub use model::SsdModel;
pub use postprocess::{BoundingBox, Detection, VOC_CLASSES, decode_detections};
pub use preprocess::{InputSize, PreprocessConfig, PreprocessOutput, preprocess_image};
pub use selector::{DEFAULT_CONFIDENCE_THRESHOLD, select_subject, select_subject_box};
