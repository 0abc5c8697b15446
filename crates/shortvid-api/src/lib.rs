//! Axum HTTP API for the ShortVid backend.
//!
//! Thin adapter over the core: submission writes a durable job record and
//! enqueues work; status reads combine the job record with the advisory
//! progress cache.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
