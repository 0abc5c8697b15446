//! Application state.

use std::sync::Arc;

use shortvid_gen::ChatClient;
use shortvid_queue::{JobQueue, ProgressCache};
use shortvid_store::JobStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: JobStore,
    pub queue: Arc<JobQueue>,
    pub progress: Arc<ProgressCache>,
    pub chat: Arc<ChatClient>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = JobStore::from_env().await?;
        let queue = JobQueue::from_env()?;
        let progress = ProgressCache::from_env()?;
        let chat = ChatClient::from_env()?;

        Ok(Self {
            config,
            store,
            queue: Arc::new(queue),
            progress: Arc::new(progress),
            chat: Arc::new(chat),
        })
    }
}
