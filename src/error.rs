//! Custom error types for superres.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the superres library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to load the ONNX model.
    #[error("failed to load model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// The model exposes an input layout this demo cannot bind.
    #[error("model exposes {count} inputs; topologies with 1 or 2 inputs are supported")]
    UnsupportedInputs { count: usize },

    /// The model works on a channel count this demo cannot convert.
    #[error("unsupported channel count {channels}; expected 1 or 3")]
    UnsupportedChannels { channels: usize },

    /// No image files were found among the input arguments.
    #[error("no suitable images were found among the inputs")]
    NoImagesFound,

    /// Every candidate image was unreadable or of the wrong size.
    #[error("no usable input images remain after validation")]
    NoUsableImages,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for superres operations.
pub type Result<T> = std::result::Result<T, Error>;
