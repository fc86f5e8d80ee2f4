//! Plate region types, region selection and cropping

use crate::error::AnprError;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::fmt;

/// Axis-aligned pixel box, `x1 < x2` and `y1 < y2`
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "[u32; 4]")]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Build a box from raw corners. Not validated; see [`crop_plate`].
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from detector coordinates, truncating toward zero and
    /// clamping to `width` x `height`. Returns `None` when nothing is left.
    pub fn clamped(x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Option<Self> {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };

        let bbox = Self::new(
            clamp(x1, width),
            clamp(y1, height),
            clamp(x2, width),
            clamp(y2, height),
        );

        (!bbox.is_degenerate()).then_some(bbox)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_degenerate(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// Whether the box lies fully inside a `width` x `height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x2 <= width && self.y2 <= height
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One candidate region reported by the plate detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub label: String,
}

/// Pick the region to read from the detector output.
///
/// Takes the first detection in the detector's own order. Single plate per
/// image is assumed: no re-ranking by score or area, no multi-plate handling.
pub fn select_region(detections: &[Detection]) -> Result<&Detection, AnprError> {
    detections.first().ok_or(AnprError::NoDetection)
}

/// Copy the pixels inside `bbox` out of `image`
pub fn crop_plate(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage, AnprError> {
    let (width, height) = image.dimensions();

    if bbox.is_degenerate() || !bbox.fits_within(width, height) {
        return Err(AnprError::InvalidRegion {
            bbox: *bbox,
            width,
            height,
        });
    }

    Ok(image.crop_imm(bbox.x1, bbox.y1, bbox.width(), bbox.height()))
}
