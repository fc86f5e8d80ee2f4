//! Detection-to-recognition pipeline for a single uploaded image

use crate::engine::VisionBackend;
use crate::enhance::Enhancer;
use crate::error::AnprError;
use crate::normalize::clean_tokens;
use crate::region::{crop_plate, select_region, BoundingBox, Detection};
use image::DynamicImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Where a request is in the pipeline. `Completed` and `Failed` are
/// terminal; the failure reason is the error returned with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Detected,
    Cropped,
    Enhanced,
    Recognized,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Detected => "detected",
            Self::Cropped => "cropped",
            Self::Enhanced => "enhanced",
            Self::Recognized => "recognized",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub filename: String,
    pub detected_text_raw: Vec<String>,
    pub cleaned_text: String,
    pub bounding_box: BoundingBox,
}

/// Composes detection, cropping, enhancement, recognition and cleanup.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Clone)]
pub struct PlatePipeline {
    backend: Arc<dyn VisionBackend>,
    enhancer: Enhancer,
}

impl PlatePipeline {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self {
            backend,
            enhancer: Enhancer::new(),
        }
    }

    /// Decode an uploaded file and run the pipeline on it
    pub fn run_bytes(&self, filename: &str, bytes: &[u8]) -> Result<PipelineResult, AnprError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| AnprError::Decode(e.to_string()))?;
        let image = DynamicImage::ImageRgb8(decoded.into_rgb8());
        self.run(filename, &image)
    }

    /// Run every stage once on `image`. No stage is retried.
    pub fn run(&self, filename: &str, image: &DynamicImage) -> Result<PipelineResult, AnprError> {
        self.run_staged(filename, image).1
    }

    /// Like `run`, also returning the terminal stage the request ended in
    pub fn run_staged(
        &self,
        filename: &str,
        image: &DynamicImage,
    ) -> (Stage, Result<PipelineResult, AnprError>) {
        let start = Instant::now();
        let mut stage = Stage::Received;

        let outcome = self.execute(filename, image, &mut stage);
        match &outcome {
            Ok(_) => {
                tracing::debug!(
                    filename,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "pipeline completed"
                );
            }
            Err(AnprError::NoDetection) => {
                tracing::info!(filename, "no plate region detected");
                advance(&mut stage, Stage::Failed);
            }
            Err(e) => {
                tracing::warn!(filename, stage = %stage, error = %e, "pipeline failed");
                advance(&mut stage, Stage::Failed);
            }
        }

        (stage, outcome)
    }

    fn execute(
        &self,
        filename: &str,
        image: &DynamicImage,
        stage: &mut Stage,
    ) -> Result<PipelineResult, AnprError> {
        // Received -> Detected
        let detections = invoke_detector(self.backend.as_ref(), image)?;
        if detections.is_empty() {
            return Err(AnprError::NoDetection);
        }
        advance(stage, Stage::Detected);
        tracing::debug!(count = detections.len(), "detector returned candidates");

        // Detected -> Cropped
        let region = select_region(&detections)?;
        let plate = crop_plate(image, &region.bbox)?;
        let bounding_box = region.bbox;
        advance(stage, Stage::Cropped);

        // Cropped -> Enhanced
        let enhanced = self.enhancer.process(plate)?;
        advance(stage, Stage::Enhanced);
        tracing::debug!(time_ms = enhanced.total_time_ms, "plate enhanced");

        // Enhanced -> Recognized
        let tokens = invoke_recognizer(self.backend.as_ref(), &enhanced.image)?;
        advance(stage, Stage::Recognized);

        // Recognized -> Completed
        let cleaned_text = clean_tokens(&tokens);
        advance(stage, Stage::Completed);

        Ok(PipelineResult {
            filename: filename.to_string(),
            detected_text_raw: tokens,
            cleaned_text,
            bounding_box,
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "pipeline stage");
    *stage = next;
}

/// Call the detector, reporting any failure as a detector error.
/// A released engine context stays an initialization error.
pub fn invoke_detector(
    backend: &dyn VisionBackend,
    image: &DynamicImage,
) -> Result<Vec<Detection>, AnprError> {
    backend.detect(image).map_err(|e| match e {
        e @ (AnprError::Detection(_) | AnprError::InitializationError(_)) => e,
        other => AnprError::Detection(other.to_string()),
    })
}

/// Call the recognizer on the enhanced plate.
///
/// An empty token list means nothing was read; an engine failure is always
/// an error, never an empty result.
pub fn invoke_recognizer(
    backend: &dyn VisionBackend,
    image: &DynamicImage,
) -> Result<Vec<String>, AnprError> {
    backend.recognize(image).map_err(|e| match e {
        e @ (AnprError::RecognitionEngine(_) | AnprError::InitializationError(_)) => e,
        other => AnprError::RecognitionEngine(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct FakeBackend {
        detections: Vec<Detection>,
        tokens: Result<Vec<String>, String>,
        recognized_sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl FakeBackend {
        fn new(detections: Vec<Detection>, tokens: Result<Vec<&str>, &str>) -> Self {
            Self {
                detections,
                tokens: tokens
                    .map(|t| t.into_iter().map(String::from).collect())
                    .map_err(String::from),
                recognized_sizes: Mutex::new(Vec::new()),
            }
        }
    }

    impl VisionBackend for FakeBackend {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, AnprError> {
            Ok(self.detections.clone())
        }

        fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError> {
            self.recognized_sizes.lock().unwrap().push(image.dimensions());
            self.tokens.clone().map_err(AnprError::RecognitionEngine)
        }
    }

    struct BrokenDetector;

    impl VisionBackend for BrokenDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, AnprError> {
            Err(AnprError::Internal("session poisoned".to_string()))
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<String>, AnprError> {
            unreachable!("recognizer must not run without a region")
        }
    }

    fn plate_detection() -> Detection {
        Detection {
            bbox: BoundingBox::new(10, 10, 110, 60),
            score: 0.9,
            label: "license_plate".to_string(),
        }
    }

    fn car_photo() -> DynamicImage {
        let img = RgbImage::from_fn(200, 100, |x, y| {
            if (10..110).contains(&x) && (10..60).contains(&y) && (x / 7) % 2 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([220, 215, 200])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_reads_plate_from_single_detection() {
        let backend = Arc::new(FakeBackend::new(
            vec![plate_detection()],
            Ok(vec!["KA", "01", "AB", "1234"]),
        ));
        let pipeline = PlatePipeline::new(backend.clone());

        let result = pipeline.run("car.jpg", &car_photo()).unwrap();

        assert_eq!(result.filename, "car.jpg");
        assert_eq!(result.cleaned_text, "KA01AB1234");
        assert_eq!(result.detected_text_raw, vec!["KA", "01", "AB", "1234"]);
        assert_eq!(result.bounding_box, BoundingBox::new(10, 10, 110, 60));
        // Recognizer saw the 100x50 crop after the 2x upscale
        assert_eq!(*backend.recognized_sizes.lock().unwrap(), vec![(200, 100)]);
    }

    #[test]
    fn test_no_detections_is_no_detection() {
        let backend = Arc::new(FakeBackend::new(vec![], Ok(vec!["IGNORED"])));
        let pipeline = PlatePipeline::new(backend.clone());

        let result = pipeline.run("empty.jpg", &car_photo());

        assert!(matches!(result, Err(AnprError::NoDetection)));
        assert!(backend.recognized_sizes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recognizer_failure_is_not_empty_success() {
        let backend = Arc::new(FakeBackend::new(
            vec![plate_detection()],
            Err("unsupported input shape"),
        ));
        let pipeline = PlatePipeline::new(backend);

        match pipeline.run("car.jpg", &car_photo()) {
            Err(AnprError::RecognitionEngine(msg)) => {
                assert!(msg.contains("unsupported input shape"))
            }
            other => panic!("expected RecognitionEngine, got {:?}", other),
        }
    }

    #[test]
    fn test_successful_run_ends_completed() {
        let backend = Arc::new(FakeBackend::new(vec![plate_detection()], Ok(vec!["KA01"])));
        let pipeline = PlatePipeline::new(backend);

        let (stage, result) = pipeline.run_staged("car.jpg", &car_photo());

        assert_eq!(stage, Stage::Completed);
        assert!(stage.is_terminal());
        assert_eq!(result.unwrap().cleaned_text, "KA01");
    }

    #[test]
    fn test_failures_end_in_failed_stage() {
        let no_plate = PlatePipeline::new(Arc::new(FakeBackend::new(vec![], Ok(vec![]))));
        let (stage, result) = no_plate.run_staged("empty.jpg", &car_photo());
        assert_eq!(stage, Stage::Failed);
        assert!(matches!(result, Err(AnprError::NoDetection)));

        let broken = PlatePipeline::new(Arc::new(FakeBackend::new(
            vec![plate_detection()],
            Err("engine crashed"),
        )));
        let (stage, result) = broken.run_staged("car.jpg", &car_photo());
        assert_eq!(stage, Stage::Failed);
        assert_eq!(stage.to_string(), "failed");
        assert!(matches!(result, Err(AnprError::RecognitionEngine(_))));
    }

    #[test]
    fn test_empty_tokens_complete_with_empty_text() {
        let backend = Arc::new(FakeBackend::new(vec![plate_detection()], Ok(vec![])));
        let result = PlatePipeline::new(backend).run("car.jpg", &car_photo()).unwrap();
        assert_eq!(result.cleaned_text, "");
        assert!(result.detected_text_raw.is_empty());
    }

    #[test]
    fn test_out_of_bounds_detection_fails_invalid_region() {
        let detection = Detection {
            bbox: BoundingBox::new(150, 50, 260, 90),
            score: 0.8,
            label: "license_plate".to_string(),
        };
        let backend = Arc::new(FakeBackend::new(vec![detection], Ok(vec!["X"])));

        let result = PlatePipeline::new(backend).run("car.jpg", &car_photo());

        assert!(matches!(result, Err(AnprError::InvalidRegion { .. })));
    }

    #[test]
    fn test_first_detection_wins() {
        let second = Detection {
            bbox: BoundingBox::new(0, 0, 200, 100),
            score: 0.99,
            label: "license_plate".to_string(),
        };
        let backend = Arc::new(FakeBackend::new(
            vec![plate_detection(), second],
            Ok(vec!["KA01"]),
        ));

        let result = PlatePipeline::new(backend).run("car.jpg", &car_photo()).unwrap();

        assert_eq!(result.bounding_box, BoundingBox::new(10, 10, 110, 60));
    }

    #[test]
    fn test_detector_failure_surfaces_as_detection_error() {
        let pipeline = PlatePipeline::new(Arc::new(BrokenDetector));
        match pipeline.run("car.jpg", &car_photo()) {
            Err(AnprError::Detection(msg)) => assert!(msg.contains("session poisoned")),
            other => panic!("expected Detection error, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let backend = Arc::new(FakeBackend::new(
            vec![plate_detection()],
            Ok(vec!["MH 12", "DE 1433"]),
        ));
        let pipeline = PlatePipeline::new(backend);

        let first = pipeline.run("car.jpg", &car_photo()).unwrap();
        let second = pipeline.run("car.jpg", &car_photo()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_run_bytes_decodes_upload() {
        let mut png = Vec::new();
        car_photo()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let backend = Arc::new(FakeBackend::new(vec![plate_detection()], Ok(vec!["KA01"])));

        let result = PlatePipeline::new(backend).run_bytes("car.png", &png).unwrap();

        assert_eq!(result.cleaned_text, "KA01");
    }

    #[test]
    fn test_run_bytes_rejects_garbage() {
        let backend = Arc::new(FakeBackend::new(vec![plate_detection()], Ok(vec![])));
        let result = PlatePipeline::new(backend).run_bytes("notes.txt", b"definitely not an image");
        assert!(matches!(result, Err(AnprError::Decode(_))));
    }

    #[test]
    fn test_result_serializes_bounding_box_as_array() {
        let result = PipelineResult {
            filename: "car.jpg".to_string(),
            detected_text_raw: vec!["KA".to_string()],
            cleaned_text: "KA".to_string(),
            bounding_box: BoundingBox::new(10, 10, 110, 60),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["bounding_box"], serde_json::json!([10, 10, 110, 60]));
    }
}
