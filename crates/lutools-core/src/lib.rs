//! LUTools Core: a colour grading engine.
//!
//! This crate parses and writes `.cube` 3D LUTs, applies an adjustment and
//! LUT pipeline to 8-bit RGB buffers, resizes images, and fits LUTs from
//! before/after image pairs. [`Engine`] is the façade a front-end drives.
//! No presentation dependencies.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fit;
pub mod grading;
pub mod image;
pub mod pipeline;
pub mod resample;
pub mod transform;

// Re-exports for convenience.
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use engine::{BatchSummary, Engine, EngineStatus, LutHandle, LutInfo};
pub use error::{ErrorKind, LutoolsError, LutoolsResult};
pub use events::{EngineEvent, EventReceiver, LogLevel, Operation};
pub use image::PixelBuffer;
pub use resample::ResizeFilter;
pub use transform::evaluate::{LutStage, evaluate_pixel};
pub use transform::lut::Lut3D;
pub use transform::params::AdjustmentParams;
