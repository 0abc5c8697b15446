//! Job queue and progress cache on Redis.
//!
//! The queue hands submissions to the worker without blocking the caller;
//! the progress cache holds expiring interim percent/step snapshots read by
//! status queries.

mod error;
mod job;
mod progress;
mod queue;

pub use error::{QueueError, QueueResult};
pub use job::RenderJob;
pub use progress::{ProgressCache, ProgressSink};
pub use queue::{JobQueue, QueueConfig};
