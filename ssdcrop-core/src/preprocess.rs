//! Preprocessing utilities for preparing frames for MobileNet-SSD inference.
//!
//! A frame is resized twice (first to the pre-resize canvas, then to the blob size), converted
//! to BGR planar layout and normalised with `(v - mean) * scale`.

use anyhow::Result;
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use ssdcrop_utils::{
    config::{AppSettings, Dimensions, ResizeQuality},
    resize_image, rgb_to_bgr_chw, timing_guard,
};
use tract_onnx::prelude::Tensor;

/// A resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<Dimensions> for InputSize {
    fn from(dimensions: Dimensions) -> Self {
        InputSize::new(dimensions.width, dimensions.height)
    }
}

/// Configuration for turning a frame into a network input tensor.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Intermediate canvas the frame is resized to first.
    pub pre_resize: InputSize,
    /// Resolution the network consumes.
    pub input_size: InputSize,
    /// Multiplier applied after mean subtraction.
    pub scale: f32,
    /// Per-channel mean subtracted from every pixel.
    pub mean: f32,
    pub resize_quality: ResizeQuality,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            pre_resize: InputSize::new(600, 600),
            input_size: InputSize::new(300, 300),
            scale: 0.007843,
            mean: 127.5,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

impl PreprocessConfig {
    fn resize_filter(&self) -> FilterType {
        match self.resize_quality {
            ResizeQuality::Quality => FilterType::Triangle,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

impl From<&AppSettings> for PreprocessConfig {
    fn from(settings: &AppSettings) -> Self {
        PreprocessConfig {
            pre_resize: settings.input.pre_resize.into(),
            input_size: settings.input.blob.into(),
            scale: settings.detection.scale,
            mean: settings.detection.mean,
            resize_quality: settings.input.resize_quality,
        }
    }
}

/// Output of preprocessing: the tensor plus the source size needed to rescale boxes.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// `[1, 3, H, W]` BGR tensor ready for inference.
    pub tensor: Tensor,
    /// Width and height of the frame before resizing.
    pub original_size: (u32, u32),
}

/// Preprocess an in-memory frame.
pub fn preprocess_image(image: &DynamicImage, config: &PreprocessConfig) -> Result<PreprocessOutput> {
    let _guard = timing_guard("ssdcrop_core::preprocess_image", log::Level::Trace);
    let InputSize {
        width: input_w,
        height: input_h,
    } = config.input_size;
    anyhow::ensure!(
        input_w > 0 && input_h > 0,
        "input dimensions must be greater than zero"
    );
    anyhow::ensure!(
        config.pre_resize.width > 0 && config.pre_resize.height > 0,
        "pre-resize dimensions must be greater than zero"
    );

    let (orig_w, orig_h) = image.dimensions();
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "source image dimensions must be greater than zero"
    );

    let filter = config.resize_filter();
    let canvas = resize_image(
        image,
        config.pre_resize.width,
        config.pre_resize.height,
        filter,
    );
    let blob = if config.pre_resize == config.input_size {
        canvas
    } else {
        resize_image(&DynamicImage::ImageRgb8(canvas), input_w, input_h, filter)
    };
    let chw = rgb_to_bgr_chw(&blob, config.mean, config.scale);

    let shape = [1usize, 3, input_h as usize, input_w as usize];
    let (data, offset) = chw.into_raw_vec_and_offset();
    debug_assert_eq!(offset, Some(0), "expected contiguous array");
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| anyhow::anyhow!("failed to build tensor: {e}"))?;

    Ok(PreprocessOutput {
        tensor,
        original_size: (orig_w, orig_h),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn produces_blob_sized_tensor_and_keeps_source_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let out = preprocess_image(&image, &PreprocessConfig::default()).expect("preprocess");
        assert_eq!(out.tensor.shape(), &[1, 3, 300, 300]);
        assert_eq!(out.original_size, (640, 480));
    }

    #[test]
    fn normalises_to_unit_range() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 0, 127])));
        let config = PreprocessConfig {
            pre_resize: InputSize::new(8, 8),
            input_size: InputSize::new(4, 4),
            ..Default::default()
        };
        let out = preprocess_image(&image, &config).expect("preprocess");
        let data = out.tensor.as_slice::<f32>().expect("f32 tensor");
        let plane = 16;

        // Blue plane comes first and holds the 127 channel.
        assert!((data[0] - (127.0 - 127.5) * 0.007843).abs() < 1e-6);
        // Green plane is all zeros in the source.
        assert!((data[plane] + 127.5 * 0.007843).abs() < 1e-6);
        // Red plane is saturated.
        assert!((data[2 * plane] - 127.5 * 0.007843).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_input_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let config = PreprocessConfig {
            input_size: InputSize::new(0, 300),
            ..Default::default()
        };
        assert!(preprocess_image(&image, &config).is_err());
    }

    #[test]
    fn builds_from_app_settings() {
        let mut settings = AppSettings::default();
        settings.input.blob = Dimensions::new(512, 512);
        settings.detection.mean = 100.0;
        let config = PreprocessConfig::from(&settings);
        assert_eq!(config.input_size, InputSize::new(512, 512));
        assert_eq!(config.pre_resize, InputSize::new(600, 600));
        assert_eq!(config.mean, 100.0);
    }
}
