//! Plate image enhancement for recognition
//!
//! A fixed sequence of transforms that turns a colour plate crop into a
//! large, high-contrast grayscale image.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Enhanced, Enhancer, StepTiming};
