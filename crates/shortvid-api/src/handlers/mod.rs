//! Request handlers.

pub mod health;
pub mod topics;
pub mod videos;

pub use health::{health, ready};
