use super::ensure_not_empty;
use crate::error::AnprError;
use image::DynamicImage;

/// Convert the plate crop to single-channel luma
pub fn apply(image: DynamicImage) -> Result<DynamicImage, AnprError> {
    ensure_not_empty(&image)?;
    Ok(DynamicImage::ImageLuma8(image.to_luma8()))
}
