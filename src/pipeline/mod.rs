//! Super-resolution inference pipeline.

mod upscale;

pub use upscale::{Config, Pipeline};
