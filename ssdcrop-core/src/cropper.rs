//! Subject extraction: crop to the detected box, pad to a square and mirror.

use image::{Rgb, RgbImage, imageops};

use crate::postprocess::BoundingBox;

/// Pixel value used for the padding bands.
pub const PAD_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Clamp `bbox` to the image and return `(x, y, width, height)`, or `None` if nothing is left.
pub fn clamp_to_image(bbox: BoundingBox, img_w: u32, img_h: u32) -> Option<(u32, u32, u32, u32)> {
    let clamp = |value: i32, max: u32| value.clamp(0, max.min(i32::MAX as u32) as i32) as u32;
    let start_x = clamp(bbox.start_x, img_w);
    let start_y = clamp(bbox.start_y, img_h);
    let end_x = clamp(bbox.end_x, img_w);
    let end_y = clamp(bbox.end_y, img_h);
    if end_x <= start_x || end_y <= start_y {
        None
    } else {
        Some((start_x, start_y, end_x - start_x, end_y - start_y))
    }
}

/// Copy the region covered by `bbox` out of `image`.
///
/// Coordinates outside the frame are clamped to its edges. Returns `None` for a degenerate box.
pub fn crop_to_box(image: &RgbImage, bbox: BoundingBox) -> Option<RgbImage> {
    let (x, y, width, height) = clamp_to_image(bbox, image.width(), image.height())?;
    Some(imageops::crop_imm(image, x, y, width, height).to_image())
}

/// Pad the shorter side symmetrically with [`PAD_COLOR`].
///
/// Each band is `(long - short) / 2` pixels wide, so an odd difference leaves the result one
/// pixel short of square. Square input is returned untouched.
pub fn pad_to_square(image: RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let (pad_x, pad_y) = if height > width {
        ((height - width) / 2, 0)
    } else if height < width {
        (0, (width - height) / 2)
    } else {
        return image;
    };

    let mut canvas = RgbImage::from_pixel(width + 2 * pad_x, height + 2 * pad_y, PAD_COLOR);
    imageops::replace(&mut canvas, &image, i64::from(pad_x), i64::from(pad_y));
    canvas
}

/// Flip left to right.
pub fn mirror(image: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(image)
}

/// Crop, square-pad and mirror the subject covered by `bbox`.
pub fn prepare_subject(image: &RgbImage, bbox: BoundingBox) -> Option<RgbImage> {
    let cropped = crop_to_box(image, bbox)?;
    Some(mirror(&pad_to_square(cropped)))
}
