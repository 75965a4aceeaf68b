//! # superres
//!
//! A library for up-scaling images through a pre-trained super-resolution
//! network executed by ONNX Runtime.
//!
//! The runtime is treated as an opaque collaborator: this crate binds image
//! buffers to the model's input tensors, runs a serial timed inference loop,
//! and converts the output tensor back into PNG images. It contains no
//! operator kernels and no training code.
//!
//! ## Example
//!
//! ```no_run
//! use superres::{Config, Pipeline};
//!
//! # fn main() -> superres::Result<()> {
//! let config = Config::default();
//! let mut pipeline = Pipeline::new("single-image-super-resolution.onnx", config)?;
//!
//! let inputs = vec!["city.png".into()];
//! let written = pipeline.process(&inputs)?;
//! println!("up-scaled {} image(s)", written.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use model::Device;
pub use pipeline::{Config, Pipeline};
