use crate::error::AnprError;
use crate::region::Detection;
use image::DynamicImage;

/// Locates plate-shaped regions in a full photograph
pub trait PlateDetector: Send + Sync {
    /// Returns the detector identifier (e.g., "yolo")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the detector
    fn description(&self) -> &'static str;

    /// Candidate regions in the detector's own order; may be empty
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, AnprError>;
}

/// Reads text from an already isolated plate image
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Text tokens in the engine's reading order; may be empty
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError>;
}

/// Everything the plate pipeline needs from the model layer
///
/// Implementations must be safe to call from many requests at once.
pub trait VisionBackend: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, AnprError>;

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError>;
}
