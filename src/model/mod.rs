//! Model loading and device selection.

mod loader;

pub use loader::{load_session, tensor_dims, Device, LoaderOptions};
