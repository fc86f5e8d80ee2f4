//! YOLO plate detector
//!
//! Runs a YOLOv8-style ONNX export through ONNX Runtime. The model is
//! expected to emit a single `[1, 4 + classes, anchors]` tensor (or its
//! transpose) of centre/size boxes followed by per-class scores.

use crate::config::DetectorConfig;
use crate::engine::PlateDetector;
use crate::error::AnprError;
use crate::models;
use crate::region::{BoundingBox, Detection};
use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::sync::Mutex;

/// Padding colour used by YOLO letterboxing
const PAD_VALUE: u8 = 114;

const DETECTOR_MODEL_FILE: &str = "plate-detector.onnx";

/// How a source image was fitted into the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    /// Size of the resized image inside the square
    pub width: u32,
    pub height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target);
        Self {
            scale,
            width: new_w,
            height: new_h,
            pad_x: (target - new_w) / 2,
            pad_y: (target - new_h) / 2,
        }
    }

    /// Map a model-space coordinate back onto the source image
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Detection in source-image float coordinates, before clamping
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: usize,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// ONNX plate detector
pub struct YoloDetector {
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    config: DetectorConfig,
}

impl YoloDetector {
    /// Load the detector, downloading the model first if no path is configured
    pub fn new(config: &DetectorConfig) -> Result<Self, AnprError> {
        let model_path = match &config.model_path {
            Some(path) => {
                if !path.exists() {
                    return Err(AnprError::InitializationError(format!(
                        "Detector model not found: {}",
                        path.display()
                    )));
                }
                path.clone()
            }
            None => models::ensure_model_downloaded(&config.model_url, DETECTOR_MODEL_FILE)?,
        };

        tracing::info!("Loading plate detector from {}", model_path.display());

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| {
                AnprError::InitializationError(format!("Failed to load detector model: {}", e))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        tracing::info!(
            input = %input_name,
            input_size = config.input_size,
            classes = config.labels.len(),
            "Plate detector initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            config: config.clone(),
        })
    }

    fn run_model(
        &self,
        input: Array4<f32>,
        letterbox: &Letterbox,
        (width, height): (u32, u32),
    ) -> Result<Vec<Detection>, AnprError> {
        let input_value = Value::from_array(input)
            .map_err(|e| AnprError::Detection(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AnprError::Detection("Detector session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| AnprError::Detection(format!("Detection inference failed: {}", e)))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| AnprError::Detection(format!("Failed to extract output tensor: {}", e)))?;

        decode_output(output, letterbox, &self.config, width, height)
    }
}

impl PlateDetector for YoloDetector {
    fn name(&self) -> &'static str {
        "yolo"
    }

    fn description(&self) -> &'static str {
        "YOLO object detector on ONNX Runtime"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, AnprError> {
        let dims = image.dimensions();
        if dims.0 == 0 || dims.1 == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = preprocess(image, self.config.input_size);
        let detections = self.run_model(input, &letterbox, dims)?;

        tracing::debug!("Detected {} candidate regions", detections.len());
        Ok(detections)
    }
}

/// Letterbox `image` into a `[1, 3, size, size]` tensor scaled to 0..1
pub fn preprocess(image: &DynamicImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::new(width, height, size);

    let resized = image
        .resize_exact(letterbox.width, letterbox.height, FilterType::Triangle)
        .to_rgb8();
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    let side = size as usize;
    let mut tensor = Array4::zeros((1, 3, side, side));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}

/// Turn raw model output into ordered detections on the source image
fn decode_output(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    config: &DetectorConfig,
    width: u32,
    height: u32,
) -> Result<Vec<Detection>, AnprError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(AnprError::Detection(format!(
            "Unexpected detector output shape: {:?}",
            shape
        )));
    }

    let batch = output.index_axis(Axis(0), 0);
    // Rows are attributes, columns are anchors; anchors always outnumber attributes
    let table = if shape[1] > shape[2] {
        batch.reversed_axes()
    } else {
        batch
    }
    .into_dimensionality::<Ix2>()
    .map_err(|e| AnprError::Detection(format!("Failed to read detector output: {}", e)))?;

    let attributes = table.shape()[0];
    if attributes < 5 {
        return Err(AnprError::Detection(format!(
            "Detector output has {} attributes, expected at least 5",
            attributes
        )));
    }

    let mut candidates = Vec::new();
    for anchor in table.axis_iter(Axis(1)) {
        let (class_id, score) = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best });

        if score < config.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            x1,
            y1,
            x2,
            y2,
            score,
            class_id,
        });
    }

    let kept = non_max_suppression(candidates, config.iou_threshold);

    Ok(kept
        .into_iter()
        .take(config.max_detections)
        .filter_map(|c| {
            let bbox = BoundingBox::clamped(c.x1, c.y1, c.x2, c.y2, width, height)?;
            Some(Detection {
                bbox,
                score: c.score,
                label: label_for(&config.labels, c.class_id),
            })
        })
        .collect())
}

/// Greedy per-class NMS; the result is ordered by descending score
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn label_for(labels: &[String], class_id: usize) -> String {
    labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}
