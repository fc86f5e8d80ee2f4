use crate::error::AnprError;
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;

type StepFn = fn(DynamicImage) -> Result<DynamicImage, AnprError>;

/// Steps in the only order they may run. Thresholding expects a blurred
/// grayscale image and the upscale must see a binary one.
const STEPS: [(&str, StepFn); 4] = [
    ("grayscale", steps::grayscale::apply),
    ("blur", steps::blur::apply),
    ("threshold", steps::threshold::apply),
    ("upscale", steps::upscale::apply),
];

/// Timing information for a single enhancement step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Enhanced plate image plus per-step timings
#[derive(Debug, Clone, Serialize)]
pub struct Enhanced {
    /// Enhanced image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total enhancement time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Runs the fixed enhancement sequence on a plate crop
#[derive(Debug, Clone, Copy, Default)]
pub struct Enhancer;

impl Enhancer {
    pub fn new() -> Self {
        Self
    }

    /// Names of the steps, in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        STEPS.iter().map(|(name, _)| *name).collect()
    }

    /// Turn a colour plate crop into a binarized, upscaled grayscale image
    pub fn process(&self, image: DynamicImage) -> Result<Enhanced, AnprError> {
        let start = Instant::now();
        let mut steps_timing = Vec::with_capacity(STEPS.len());

        let mut img = image;
        for (name, step_fn) in STEPS {
            img = self.run_step(name, img, &mut steps_timing, step_fn)?;
        }

        Ok(Enhanced {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, AnprError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, AnprError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!(step = name, time_ms, "enhancement step finished");
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
