use std::path::Path;

use anyhow::{Context, Result};
use image::{
    DynamicImage, ImageDecoder, ImageReader, RgbImage, imageops::FilterType,
    metadata::Orientation,
};
use ndarray::Array3;

/// Load an image from disk into memory, upright.
///
/// The format is guessed from the file content before the extension, and any EXIF orientation
/// is applied so the frame matches how viewers display it.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    let context = || format!("failed to open image {}", path_ref.display());
    let mut decoder = ImageReader::open(path_ref)
        .with_context(context)?
        .with_guessed_format()
        .with_context(context)?
        .into_decoder()
        .with_context(context)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).with_context(context)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Resize an image to the requested resolution using the provided filter.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    image.resize_exact(width, height, filter).to_rgb8()
}

/// Convert an RGB image into a normalised BGR CHW array.
///
/// Every value becomes `(pixel - mean) * scale`, matching OpenCV's `blobFromImage` with
/// `swapRB = false` on a BGR frame.
///
/// # Arguments
///
/// * `image` - The RGB image to convert.
/// * `mean` - Value subtracted from each channel.
/// * `scale` - Multiplier applied after the subtraction.
pub fn rgb_to_bgr_chw(image: &RgbImage, mean: f32, scale: f32) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(0, yi, xi)] = (pixel[2] as f32 - mean) * scale; // Blue
        array[(1, yi, xi)] = (pixel[1] as f32 - mean) * scale; // Green
        array[(2, yi, xi)] = (pixel[0] as f32 - mean) * scale; // Red
    }
    array
}
