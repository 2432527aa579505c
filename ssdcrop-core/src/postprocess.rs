use anyhow::Result;
use serde::Serialize;
use tract_onnx::prelude::{Tensor, tract_ndarray::ArrayView2};

/// Labels of the PASCAL VOC classes MobileNet-SSD was trained on, indexed by class id.
pub const VOC_CLASSES: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

const ROW_WIDTH: usize = 7;

/// Axis-aligned box in source-frame pixel coordinates.
///
/// `start` is inclusive and `end` exclusive, as with array slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> i32 {
        self.end_y - self.start_y
    }

    /// Scale normalised corners to a `width` x `height` frame, truncating toward zero.
    pub fn from_normalized(corners: [f32; 4], width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            start_x: (corners[0] * w) as i32,
            start_y: (corners[1] * h) as i32,
            end_x: (corners[2] * w) as i32,
            end_y: (corners[3] * h) as i32,
        }
    }
}

/// A single detector hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub score: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Human-readable class name, or `"unknown"` for ids outside the VOC table.
    pub fn label(&self) -> &'static str {
        VOC_CLASSES.get(self.class_id).copied().unwrap_or("unknown")
    }
}

/// Decode raw SSD output rows into detections in emission order.
///
/// Nothing is sorted or filtered here; the selection policy lives in [`crate::selector`].
///
/// # Arguments
///
/// * `output` - The detection tensor produced by the network.
/// * `original_size` - Width and height of the source frame the boxes are scaled to.
pub fn decode_detections(output: &Tensor, original_size: (u32, u32)) -> Result<Vec<Detection>> {
    let rows = detection_rows(output)?;
    let (width, height) = original_size;

    let mut detections = Vec::with_capacity(rows.nrows());
    for row in rows.rows() {
        let score = if row[2].is_finite() { row[2] } else { 0.0 };
        let class_id = if row[1].is_finite() && row[1] >= 0.0 {
            row[1] as usize
        } else {
            usize::MAX
        };
        detections.push(Detection {
            class_id,
            score,
            bbox: BoundingBox::from_normalized([row[3], row[4], row[5], row[6]], width, height),
        });
    }
    Ok(detections)
}

/// View the output tensor as `N x 7` rows.
fn detection_rows(output: &Tensor) -> Result<ArrayView2<'_, f32>> {
    let rows = match output.shape() {
        [rows, ROW_WIDTH] => *rows,
        [1, rows, ROW_WIDTH] => *rows,
        [1, 1, rows, ROW_WIDTH] => *rows,
        other => anyhow::bail!(
            "SSD output must have shape [N, 7], [1, N, 7] or [1, 1, N, 7] (got {:?})",
            other
        ),
    };

    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("SSD output is not f32: {e}"))?;

    ArrayView2::from_shape((rows, ROW_WIDTH), slice)
        .map_err(|_| anyhow::anyhow!("SSD output data is not contiguous"))
}
