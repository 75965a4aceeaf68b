//! Image loading, tensor conversion, and saving utilities.

mod load;
mod save;

pub use load::{collect_image_paths, read_matching, to_batch_tensor, to_resized_batch, InputImage};
pub use save::{open_in_viewer, save_outputs};

use ndarray::Array4;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Input tensors carry raw pixel intensities in [0, 255]; output tensors
/// hold per-channel planes in [0, 1].
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
