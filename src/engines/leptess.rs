//! Leptess/Tesseract recognizer implementation
//!
//! Tesseract-based OCR engine. Uses tesseract-static crate for static linking
//! (no system dependencies). Downloads tessdata automatically on first use.

use crate::config::Config;
use crate::engine::TextRecognizer;
use crate::error::AnprError;
use crate::models;
use image::DynamicImage;
use tesseract_static::tesseract::Tesseract;

/// Tesseract recognizer
///
/// A Tesseract handle is not shareable between threads, so one is created
/// per call from the validated tessdata directory.
pub struct LeptessRecognizer {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Language for OCR
    language: String,
}

impl LeptessRecognizer {
    /// Create a new Tesseract-based recognizer
    pub fn new(config: &Config) -> Result<Self, AnprError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            AnprError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Leptess recognizer initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl TextRecognizer for LeptessRecognizer {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    /// One token per non-empty output line
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError> {
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| {
                AnprError::RecognitionEngine(format!("Failed to convert to BMP: {}", e))
            })?;

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| {
                AnprError::RecognitionEngine(format!("Failed to create Tesseract: {}", e))
            })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            AnprError::RecognitionEngine(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| AnprError::RecognitionEngine(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| AnprError::RecognitionEngine(format!("Failed to get text: {}", e)))?;

        Ok(split_lines(&text))
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ensure tessdata is available in the model cache, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, AnprError> {
    let cache_dir = models::cache_dir().join("tessdata");
    let traineddata_file = format!("{}.traineddata", language);

    models::ensure_model_in(&cache_dir, &tessdata_url(language), &traineddata_file)?;

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AnprError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
