//! License plate recognition: locate a plate in a photograph, enhance it and
//! read it with an OCR engine.

pub mod config;
pub mod engine;
pub mod engines;
pub mod enhance;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod region;
pub mod server;

pub use engine::{PlateDetector, TextRecognizer, VisionBackend};
pub use error::AnprError;
pub use pipeline::{PipelineResult, PlatePipeline};
pub use region::{BoundingBox, Detection};
