//! Orchestration of the super-resolution inference run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::{self, ImageTensor, RGB_CHANNELS};
use crate::model::{self, Device, LoaderOptions};

/// Configuration for the super-resolution run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inference device.
    pub device: Device,

    /// Number of timed inference iterations.
    pub iterations: u32,

    /// Shared library with custom operator implementations.
    pub ops_library: Option<PathBuf>,

    /// Enable the runtime's performance profiler.
    pub profiling: bool,

    /// Open the written images in the system image viewer.
    pub show: bool,

    /// Directory that receives the output images.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            iterations: 1,
            ops_library: None,
            profiling: false,
            show: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "iterations".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Spatial expectations a model input imposes on the images bound to it.
struct InputShape {
    channels: usize,
    /// Fixed (width, height), or `None` when the spatial axes are dynamic.
    size: Option<(u32, u32)>,
}

impl InputShape {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn of(session: &Session, index: usize) -> Result<Self> {
        let input = &session.inputs[index];
        let dims = model::tensor_dims(&input.input_type);

        if dims.len() != 4 {
            return Err(Error::ShapeMismatch {
                expected: "4D NCHW input".to_string(),
                actual: format!("{dims:?}"),
            });
        }

        tracing::debug!("Input '{}' dims: {dims:?}", input.name);

        // Dynamic channel axes are treated as RGB.
        let channels = if dims[1] > 0 { dims[1] as usize } else { RGB_CHANNELS };
        let size = (dims[2] > 0 && dims[3] > 0).then(|| (dims[3] as u32, dims[2] as u32));

        Ok(Self { channels, size })
    }
}

/// Pipeline that up-scales images through a super-resolution model.
pub struct Pipeline {
    config: Config,
    session: Session,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration, loading the model
    /// at `model_path` onto the configured device.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model cannot
    /// be loaded.
    pub fn new<P: AsRef<Path>>(model_path: P, config: Config) -> Result<Self> {
        config.validate()?;

        let model_path = model_path.as_ref();
        tracing::info!("Loading model {} on {}", model_path.display(), config.device);

        let options = LoaderOptions {
            device: config.device,
            ops_library: config.ops_library.clone(),
            profiling: config.profiling,
        };
        let session = model::load_session(model_path, &options)?;

        tracing::info!("Model loaded");

        Ok(Self { config, session })
    }

    /// Up-scale the given input images.
    ///
    /// Inputs may be image files or directories to scan. All usable images
    /// are bound into one batched tensor, inference runs for the configured
    /// number of timed iterations, and the last iteration's output is
    /// decoded and written as `sr_<n>.png` files.
    ///
    /// # Returns
    ///
    /// The paths of the written output images.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable input image remains, the model's input
    /// layout is unsupported, or inference fails.
    pub fn process(&mut self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let paths = image::collect_image_paths(inputs)?;

        let input_count = self.session.inputs.len();
        if input_count != 1 && input_count != 2 {
            return Err(Error::UnsupportedInputs { count: input_count });
        }

        tracing::info!("Preparing input tensors");

        let lr_shape = InputShape::of(&self.session, 0)?;
        let images = image::read_matching(&paths, lr_shape.size)?;
        tracing::info!("Batch size is {}", images.len());

        let lr_tensor = to_ort(image::to_batch_tensor(&images, lr_shape.channels)?)?;

        // Two-input topologies take a bicubic-up-sampled copy of the image
        // on the second input, at the size that input declares.
        let aux_tensor = if input_count == 2 {
            let aux_shape = InputShape::of(&self.session, 1)?;
            let size = aux_shape.size.ok_or_else(|| Error::ShapeMismatch {
                expected: "fixed spatial axes on the up-sampled input".to_string(),
                actual: "dynamic axes".to_string(),
            })?;
            Some(to_ort(image::to_resized_batch(&images, size, aux_shape.channels)?)?)
        } else {
            None
        };

        let output = self.timed_inference(&lr_tensor, aux_tensor.as_ref())?;

        let (n, c, h, w) = output.dim();
        tracing::info!("Output size [N,C,H,W]: {n}, {c}, {h}, {w}");

        let written = image::save_outputs(&output, &self.config.output_dir)?;

        if self.config.show {
            for path in &written {
                tracing::info!("Opening {} in the system image viewer", path.display());
                image::open_in_viewer(path)?;
            }
        }

        Ok(written)
    }

    /// Run the serial timing loop and decode the last iteration's output.
    fn timed_inference(
        &mut self,
        lr: &Tensor<f32>,
        aux: Option<&Tensor<f32>>,
    ) -> Result<ImageTensor> {
        let iterations = self.config.iterations;
        tracing::info!("Start inference ({iterations} iterations)");

        let pb = ProgressBar::new(u64::from(iterations));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Inference [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );

        let mut total = Duration::ZERO;
        let mut output = None;

        for iter in 0..iterations {
            let start = Instant::now();
            let outputs = match aux {
                Some(aux) => self.session.run(ort::inputs![lr, aux]),
                None => self.session.run(ort::inputs![lr]),
            }
            .map_err(|source| Error::Inference { source })?;
            let elapsed = start.elapsed();
            total += elapsed;

            tracing::debug!("Iteration {}/{iterations} took {elapsed:.2?}", iter + 1);

            if iter + 1 == iterations {
                let first = outputs.values().next().ok_or_else(|| Error::ShapeMismatch {
                    expected: "one output tensor".to_string(),
                    actual: "no output".to_string(),
                })?;
                output = Some(extract_array4(&first)?);
            }

            pb.inc(1);
        }

        pb.finish_and_clear();

        let avg_ms = total.as_secs_f64() * 1000.0 / f64::from(iterations);
        println!("Average running time of one iteration: {avg_ms:.3} ms");

        if self.config.profiling {
            let trace = self
                .session
                .end_profiling()
                .map_err(|source| Error::Inference { source })?;
            tracing::info!("Performance trace written to {trace}");
        }

        output.ok_or_else(|| Error::InvalidParameter {
            name: "iterations".to_string(),
            reason: "must be greater than 0".to_string(),
        })
    }
}

/// Wrap an ndarray tensor as a runtime input value.
fn to_ort(array: ImageTensor) -> Result<Tensor<f32>> {
    Tensor::from_array(array).map_err(|source| Error::Inference { source })
}

/// Extract a 4D array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array4(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 {
        return Err(Error::ShapeMismatch {
            expected: "4D tensor".to_string(),
            actual: format!("{}D tensor", dims.len()),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = Config {
            iterations: 0,
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { name, .. }) if name == "iterations"
        ));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device, Device::Cpu);
        assert_eq!(config.iterations, 1);
        assert!(!config.show);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }
}
