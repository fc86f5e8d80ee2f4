//! Detector and recognizer implementations
//!
//! This module contains the concrete model adapters behind the
//! `PlateDetector` and `TextRecognizer` traits. Adapters are conditionally
//! compiled based on feature flags.

#[cfg(feature = "detector-yolo")]
pub mod yolo;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::{PlateDetector, TextRecognizer, VisionBackend};
use crate::error::AnprError;
use crate::region::Detection;
use image::DynamicImage;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Information about a loaded component
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

struct Loaded {
    detector: Arc<dyn PlateDetector>,
    recognizer: Arc<dyn TextRecognizer>,
}

/// Process-wide detector and recognizer, loaded once at startup.
///
/// Shared by every request; `shutdown` releases the models, after which
/// calls fail with an initialization error.
pub struct EngineContext {
    loaded: RwLock<Option<Loaded>>,
    detector_info: EngineInfo,
    recognizer_info: EngineInfo,
}

impl EngineContext {
    /// Build the detector and the configured recognizer
    pub fn new(config: &Config) -> Result<Self, AnprError> {
        let detector = build_detector(config)?;
        let recognizer = build_recognizer(config)?;
        Ok(Self::from_parts(detector, recognizer))
    }

    /// Wrap already constructed components
    pub fn from_parts(
        detector: Arc<dyn PlateDetector>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        let detector_info = EngineInfo {
            name: detector.name(),
            description: detector.description(),
        };
        let recognizer_info = EngineInfo {
            name: recognizer.name(),
            description: recognizer.description(),
        };

        tracing::info!(
            detector = detector_info.name,
            recognizer = recognizer_info.name,
            "Engine context ready"
        );

        Self {
            loaded: RwLock::new(Some(Loaded {
                detector,
                recognizer,
            })),
            detector_info,
            recognizer_info,
        }
    }

    pub fn detector_info(&self) -> &EngineInfo {
        &self.detector_info
    }

    pub fn recognizer_info(&self) -> &EngineInfo {
        &self.recognizer_info
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.read().map(|l| l.is_some()).unwrap_or(false)
    }

    /// Drop the loaded models. Calls already holding a component finish first.
    pub fn shutdown(&self) {
        match self.loaded.write() {
            Ok(mut loaded) => {
                if loaded.take().is_some() {
                    tracing::info!("Engine context shut down");
                }
            }
            Err(_) => tracing::warn!("Engine context lock poisoned during shutdown"),
        }
    }

    fn components(&self) -> Result<(Arc<dyn PlateDetector>, Arc<dyn TextRecognizer>), AnprError> {
        let loaded = self
            .loaded
            .read()
            .map_err(|_| AnprError::Internal("Engine context lock poisoned".to_string()))?;
        loaded
            .as_ref()
            .map(|l| (l.detector.clone(), l.recognizer.clone()))
            .ok_or_else(|| AnprError::InitializationError("Engines have been shut down".to_string()))
    }
}

impl VisionBackend for EngineContext {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, AnprError> {
        let (detector, _) = self.components()?;
        detector.detect(image)
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError> {
        let (_, recognizer) = self.components()?;
        recognizer.recognize(image)
    }
}

#[cfg(feature = "detector-yolo")]
fn build_detector(config: &Config) -> Result<Arc<dyn PlateDetector>, AnprError> {
    tracing::info!("Initializing YOLO plate detector...");
    Ok(Arc::new(yolo::YoloDetector::new(&config.detector)?))
}

#[cfg(not(feature = "detector-yolo"))]
fn build_detector(_config: &Config) -> Result<Arc<dyn PlateDetector>, AnprError> {
    Err(AnprError::InitializationError(
        "No plate detector available. Build with --features detector-yolo".to_string(),
    ))
}

fn build_recognizer(config: &Config) -> Result<Arc<dyn TextRecognizer>, AnprError> {
    let mut available: Vec<&str> = Vec::new();

    #[cfg(feature = "engine-ocrs")]
    available.push("ocrs");

    #[cfg(feature = "engine-leptess")]
    available.push("leptess");

    let name = match config.recognizer.as_deref() {
        Some(requested) => requested,
        None => available.first().copied().ok_or_else(|| {
            AnprError::InitializationError(
                "No recognizer available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
            )
        })?,
    };

    tracing::info!("Initializing {} recognizer...", name);

    match name {
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => Ok(Arc::new(ocrs::OcrsRecognizer::new()?)),
        #[cfg(feature = "engine-leptess")]
        "leptess" => Ok(Arc::new(leptess::LeptessRecognizer::new(config)?)),
        other => Err(AnprError::InitializationError(format!(
            "Unknown recognizer '{}'. Available: {}",
            other,
            available.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BoundingBox;

    struct StaticDetector;

    impl PlateDetector for StaticDetector {
        fn name(&self) -> &'static str {
            "static"
        }

        fn description(&self) -> &'static str {
            "always finds the same plate"
        }

        fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, AnprError> {
            Ok(vec![Detection {
                bbox: BoundingBox::new(1, 1, 5, 5),
                score: 1.0,
                label: "license_plate".to_string(),
            }])
        }
    }

    struct EchoRecognizer;

    impl TextRecognizer for EchoRecognizer {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "reports the image size"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, AnprError> {
            Ok(vec![format!("{}x{}", image.width(), image.height())])
        }
    }

    fn context() -> EngineContext {
        EngineContext::from_parts(Arc::new(StaticDetector), Arc::new(EchoRecognizer))
    }

    #[test]
    fn test_context_delegates_to_components() {
        let ctx = context();
        let image = DynamicImage::new_rgb8(8, 4);

        assert_eq!(ctx.detect(&image).unwrap().len(), 1);
        assert_eq!(ctx.recognize(&image).unwrap(), vec!["8x4"]);
        assert_eq!(ctx.detector_info().name, "static");
        assert_eq!(ctx.recognizer_info().name, "echo");
    }

    #[test]
    fn test_shutdown_releases_components() {
        let ctx = context();
        assert!(ctx.is_loaded());

        ctx.shutdown();

        assert!(!ctx.is_loaded());
        let image = DynamicImage::new_rgb8(8, 4);
        assert!(matches!(
            ctx.detect(&image),
            Err(AnprError::InitializationError(_))
        ));
        // Second shutdown is a no-op
        ctx.shutdown();
    }

    #[test]
    fn test_unknown_recognizer_is_rejected() {
        let config = Config {
            recognizer: Some("nope".to_string()),
            ..Config::default()
        };
        match build_recognizer(&config) {
            Err(AnprError::InitializationError(msg)) => assert!(msg.contains("nope")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("unknown recognizer accepted"),
        }
    }
}
