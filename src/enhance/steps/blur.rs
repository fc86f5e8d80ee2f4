use super::ensure_not_empty;
use crate::error::AnprError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use imageproc::map::map_subpixels;

/// 3x3 binomial approximation of a Gaussian, weights sum to 1
#[rustfmt::skip]
const KERNEL: [f32; 9] = [
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
    2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0,
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
];

/// Smooth high-frequency noise before thresholding.
/// Border pixels are replicated outward.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, AnprError> {
    ensure_not_empty(&image)?;
    let gray = image.to_luma8();
    // Filter in f32 and round; a direct u8 output would truncate
    let smoothed: ImageBuffer<Luma<f32>, Vec<f32>> = filter3x3(&gray, &KERNEL);
    let blurred: GrayImage = map_subpixels(&smoothed, |v: f32| v.round().clamp(0.0, 255.0) as u8);
    Ok(DynamicImage::ImageLuma8(blurred))
}
