use std::path::Path;

use anyhow::Result;
use image::DynamicImage;

use crate::model::SsdModel;
use crate::postprocess::{Detection, decode_detections};
use crate::preprocess::{PreprocessConfig, preprocess_image};
use ssdcrop_utils::timing_guard;

/// Anything that can turn a decoded frame into detections in emission order.
///
/// The dataset walker only depends on this trait, so it can be driven by a stub in tests.
pub trait SubjectDetector {
    /// Detect objects in `image`; boxes are in `image`'s pixel coordinates.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// MobileNet-SSD detector.
///
/// Owns the loaded network, which is created once and reused for every frame.
#[derive(Debug)]
pub struct SsdDetector {
    model: SsdModel,
    preprocess: PreprocessConfig,
}

impl SsdDetector {
    /// Load the model at `model_path` for the configured input size.
    ///
    /// # Arguments
    ///
    /// * `model_path` - The path to the ONNX model file.
    /// * `preprocess` - The configuration for image preprocessing.
    pub fn new<P: AsRef<Path>>(model_path: P, preprocess: PreprocessConfig) -> Result<Self> {
        let model = SsdModel::load(model_path, preprocess.input_size)?;
        Ok(Self { model, preprocess })
    }
}

impl SubjectDetector for SsdDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let _guard = timing_guard("ssdcrop_core::detect", log::Level::Debug);
        let prep = preprocess_image(image, &self.preprocess)?;

        let raw = {
            let _guard = timing_guard("ssdcrop_core::onnx_inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };

        decode_detections(&raw, prep.original_size)
    }
}

impl<D: SubjectDetector + ?Sized> SubjectDetector for &D {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        (**self).detect(image)
    }
}
