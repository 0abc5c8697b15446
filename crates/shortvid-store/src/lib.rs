//! Durable job record store.
//!
//! Single source of truth for job identity, inputs and terminal state,
//! survivable across process restarts. Backed by SQLite via sqlx.

mod error;
mod job_store;

pub use error::{StoreError, StoreResult};
pub use job_store::JobStore;
