//! OCRS recognizer implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::engine::TextRecognizer;
use crate::error::AnprError;
use crate::models;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Recognizer wrapping the ocrs library
pub struct OcrsRecognizer {
    engine: OcrsOcrEngine,
}

impl OcrsRecognizer {
    /// Create a new recognizer, downloading models if needed
    pub fn new() -> Result<Self, AnprError> {
        tracing::info!("Initializing ocrs recognizer...");

        let detection_model_path =
            models::ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            models::ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            AnprError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            AnprError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            AnprError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs recognizer initialized successfully");

        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    /// One token per recognized text line, in the engine's reading order
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError> {
        // ImageSource::from_bytes expects HWC RGB
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            AnprError::RecognitionEngine(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            AnprError::RecognitionEngine(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            AnprError::RecognitionEngine(format!("Failed to detect words: {}", e))
        })?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| AnprError::RecognitionEngine(format!("Failed to recognize text: {}", e)))?;

        let tokens: Vec<String> = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|text| !text.is_empty())
            .collect();

        tracing::debug!("ocrs read {} text lines", tokens.len());
        Ok(tokens)
    }
}
