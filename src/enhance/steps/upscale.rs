use super::ensure_not_empty;
use crate::error::AnprError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Linear scale factor applied to both dimensions
const SCALE: u32 = 2;

/// Enlarge glyphs for the recognizer using cubic interpolation
pub fn apply(image: DynamicImage) -> Result<DynamicImage, AnprError> {
    ensure_not_empty(&image)?;
    let (width, height) = image.dimensions();
    Ok(image.resize_exact(width * SCALE, height * SCALE, FilterType::CatmullRom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_upscale_doubles_dimensions() {
        for (w, h) in [(1, 1), (100, 50), (37, 11), (3, 200)] {
            let img = GrayImage::new(w, h);
            let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
            assert_eq!(result.dimensions(), (w * 2, h * 2));
        }
    }

    #[test]
    fn test_upscale_stays_grayscale() {
        let img = GrayImage::from_fn(10, 4, |x, _| Luma([if x < 5 { 0 } else { 255 }]));
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.color(), image::ColorType::L8);
        let gray = result.to_luma8();
        assert!(gray.get_pixel(0, 0).0[0] <= 2);
        assert!(gray.get_pixel(19, 7).0[0] >= 253);
    }

    #[test]
    fn test_upscale_rejects_empty_image() {
        assert!(matches!(
            apply(DynamicImage::ImageLuma8(GrayImage::new(0, 3))),
            Err(AnprError::EmptyRegion)
        ));
    }
}
