//! Individual enhancement steps

pub mod blur;
pub mod grayscale;
pub mod threshold;
pub mod upscale;

use crate::error::AnprError;
use image::DynamicImage;

/// Reject zero-area input before a step touches it
pub(crate) fn ensure_not_empty(image: &DynamicImage) -> Result<(), AnprError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(AnprError::EmptyRegion);
    }
    Ok(())
}
