//! Inference session construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ort::execution_providers::{
    CUDAExecutionProvider, ExecutionProvider, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::ValueType;

use crate::error::{Error, Result};

/// File name prefix for runtime profiling traces.
const PROFILE_PREFIX: &str = "superres_profile";

/// Inference device the model is executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Default CPU execution provider.
    #[default]
    Cpu,
    /// CUDA execution provider.
    Cuda,
    /// TensorRT execution provider.
    TensorRt,
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "tensorrt" | "trt" => Ok(Self::TensorRt),
            other => Err(Error::InvalidParameter {
                name: "device".to_string(),
                reason: format!("unknown device '{other}'; expected cpu, cuda or tensorrt"),
            }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda => write!(f, "CUDA"),
            Self::TensorRt => write!(f, "TensorRT"),
        }
    }
}

/// Options applied while building the inference session.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Execution device.
    pub device: Device,

    /// Shared library with custom operator implementations, registered with
    /// the runtime before the model is loaded.
    pub ops_library: Option<PathBuf>,

    /// Enable the runtime's performance profiler.
    pub profiling: bool,
}

/// Build an inference session for the model at `model_path`.
///
/// The session is built with full graph optimization. Non-CPU execution
/// providers are registered with `error_on_failure` so that asking for an
/// absent accelerator fails loudly instead of silently running on CPU.
///
/// # Errors
///
/// Returns an error if the runtime rejects the configuration or the model
/// file.
pub fn load_session(model_path: &Path, options: &LoaderOptions) -> Result<Session> {
    let wrap = |source| Error::ModelLoad {
        path: model_path.to_path_buf(),
        source,
    };

    let mut builder = Session::builder()
        .map_err(wrap)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(wrap)?;

    match options.device {
        Device::Cpu => {}
        Device::Cuda => {
            let cuda = CUDAExecutionProvider::default();
            tracing::debug!("CUDA execution provider available: {:?}", cuda.is_available());
            builder = builder
                .with_execution_providers([cuda.build().error_on_failure()])
                .map_err(wrap)?;
        }
        Device::TensorRt => {
            let tensorrt = TensorRTExecutionProvider::default();
            tracing::debug!(
                "TensorRT execution provider available: {:?}",
                tensorrt.is_available()
            );
            builder = builder
                .with_execution_providers([tensorrt.build().error_on_failure()])
                .map_err(wrap)?;
        }
    }

    if let Some(lib) = &options.ops_library {
        builder = builder
            .with_operator_library(lib.to_string_lossy().into_owned())
            .map_err(wrap)?;
        tracing::info!("Custom operator library loaded: {}", lib.display());
    }

    if options.profiling {
        builder = builder.with_profiling(PROFILE_PREFIX).map_err(wrap)?;
    }

    builder.commit_from_file(model_path).map_err(wrap)
}

/// Dimensions of a tensor-typed input or output; dynamic axes are -1.
/// Empty for non-tensor values.
#[must_use]
pub fn tensor_dims(dtype: &ValueType) -> Vec<i64> {
    dtype
        .tensor_shape()
        .map(|shape| shape.iter().copied().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_from_str() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("gpu".parse::<Device>().unwrap(), Device::Cuda);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda);
        assert_eq!("TensorRT".parse::<Device>().unwrap(), Device::TensorRt);
    }

    #[test]
    fn test_device_from_str_unknown() {
        assert!(matches!(
            "myriad".parse::<Device>(),
            Err(Error::InvalidParameter { name, .. }) if name == "device"
        ));
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "CPU");
        assert_eq!(Device::TensorRt.to_string(), "TensorRT");
    }
}
