//! Shared application state

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::credential::CredentialResolver;
use crate::core::dispatcher::BatchDispatcher;
use crate::core::processor::ItemProcessor;
use crate::core::provider::GeminiImageClient;
use crate::core::retry::TokioSleeper;
use crate::storage::{ArtifactStore, ExecutionStore, InMemoryArtifactStore, InMemoryExecutionStore};
use crate::utils::error::Result;

/// Handles shared by every request handler
pub struct AppState {
    /// Execution records, the single source of truth
    pub store: Arc<dyn ExecutionStore>,
    /// Stored artifacts
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Dispatcher spawned once per submitted execution
    pub dispatcher: Arc<BatchDispatcher>,
}

impl AppState {
    /// Wire up the engine from configuration. The credential master key is
    /// read from the environment here, once, at startup.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let master_key = EngineConfig::master_key()?;
        let backend = Arc::new(GeminiImageClient::new(&config.provider)?);
        Ok(Self::new(
            Arc::new(InMemoryExecutionStore::new()),
            Arc::new(InMemoryArtifactStore::new()),
            backend,
            master_key,
            config,
        ))
    }

    /// Assemble state from explicit components (tests swap in mock backends)
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        artifacts: Arc<dyn ArtifactStore>,
        backend: Arc<dyn crate::core::provider::GenerationBackend>,
        master_key: Vec<u8>,
        config: &EngineConfig,
    ) -> Self {
        let processor = Arc::new(ItemProcessor::new(
            backend,
            Arc::clone(&artifacts),
            config.retry.clone(),
            Arc::new(TokioSleeper),
        ));
        let dispatcher = Arc::new(BatchDispatcher::new(
            Arc::clone(&store),
            processor,
            CredentialResolver::new(master_key),
            config.dispatcher.concurrency,
        ));
        Self {
            store,
            artifacts,
            dispatcher,
        }
    }
}
