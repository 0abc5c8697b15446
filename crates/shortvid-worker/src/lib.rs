//! Background worker for the ShortVid pipeline.
//!
//! Consumes render jobs from the queue and drives each through script
//! generation, per-scene asset fan-out and final encoding.

pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use pipeline::{process_render, RenderContext};
