use super::ensure_not_empty;
use crate::error::AnprError;
use image::{DynamicImage, GrayImage, Luma};

/// Side of the square neighbourhood used for the local mean
const BLOCK_SIZE: u32 = 11;
/// Subtracted from the local mean to form the cutoff
const BIAS: i64 = 2;

/// Apply local mean adaptive thresholding
/// Copes with shadows and uneven lighting across the plate
pub fn apply(image: DynamicImage) -> Result<DynamicImage, AnprError> {
    ensure_not_empty(&image)?;
    let gray = image.to_luma8();
    let binarized = mean_threshold(&gray, BLOCK_SIZE / 2, BIAS);
    Ok(DynamicImage::ImageLuma8(binarized))
}

/// Adaptive mean thresholding
///
/// A pixel becomes 255 when it is strictly brighter than
/// `round(mean of its window) - bias`, otherwise 0. The window extends
/// `radius` pixels in each direction with edge pixels replicated.
fn mean_threshold(img: &GrayImage, radius: u32, bias: i64) -> GrayImage {
    let (width, height) = img.dimensions();
    let side = (2 * radius + 1) as usize;
    let area = (side * side) as u64;

    let integral = compute_padded_integral(img, radius);

    GrayImage::from_fn(width, height, |x, y| {
        // Pixel (x, y) sits at (x + radius, y + radius) in the padded grid,
        // so its window starts at (x, y) there.
        let (x1, y1) = (x as usize, y as usize);
        let (x2, y2) = (x1 + side, y1 + side);

        let sum = integral[y2][x2] + integral[y1][x1] - integral[y1][x2] - integral[y2][x1];
        let mean = ((sum + area / 2) / area) as i64;

        let pixel = img.get_pixel(x, y).0[0] as i64;
        if pixel > mean - bias {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Integral image of `img` padded by `radius` replicated pixels on each side
fn compute_padded_integral(img: &GrayImage, radius: u32) -> Vec<Vec<u64>> {
    let (width, height) = img.dimensions();
    let padded_width = (width + 2 * radius) as usize;
    let padded_height = (height + 2 * radius) as usize;
    let mut integral = vec![vec![0u64; padded_width + 1]; padded_height + 1];

    for py in 0..padded_height {
        let sy = (py as i64 - radius as i64).clamp(0, height as i64 - 1) as u32;
        for px in 0..padded_width {
            let sx = (px as i64 - radius as i64).clamp(0, width as i64 - 1) as u32;
            let val = img.get_pixel(sx, sy).0[0] as u64;
            integral[py + 1][px + 1] =
                val + integral[py][px + 1] + integral[py + 1][px] - integral[py][px];
        }
    }

    integral
}
