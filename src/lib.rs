//! # genbatch
//!
//! Batch execution engine for generative image APIs. A client submits a
//! batch of prompts as one logical unit of work; the engine dispatches each
//! item to the external API under a shared encrypted credential, retries
//! transient failures with exponential backoff, tracks per-item results and
//! progress on a single execution record, and serves that record to polling
//! clients with an advisory cancellation contract.
//!
//! Partial failure is not job failure: a batch where some items failed still
//! finishes `completed`, with the failures recorded per item. `failed` is
//! reserved for faults that prevent the batch from running at all.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use genbatch::config::EngineConfig;
//! use genbatch::core::credential::CredentialResolver;
//! use genbatch::core::dispatcher::BatchDispatcher;
//! use genbatch::core::processor::ItemProcessor;
//! use genbatch::core::provider::GeminiImageClient;
//! use genbatch::core::retry::TokioSleeper;
//! use genbatch::core::types::BatchInput;
//! use genbatch::sdk::StatusPoller;
//! use genbatch::storage::{ExecutionStore, InMemoryArtifactStore, InMemoryExecutionStore};
//!
//! # async fn run(input: BatchInput) -> genbatch::utils::error::Result<()> {
//! let config = EngineConfig::default();
//! let store: Arc<dyn ExecutionStore> = Arc::new(InMemoryExecutionStore::new());
//! let artifacts = Arc::new(InMemoryArtifactStore::new());
//! let backend = Arc::new(GeminiImageClient::new(&config.provider)?);
//! let processor = Arc::new(ItemProcessor::new(
//!     backend, artifacts, config.retry.clone(), Arc::new(TokioSleeper),
//! ));
//! let dispatcher = BatchDispatcher::new(
//!     Arc::clone(&store),
//!     processor,
//!     CredentialResolver::new(EngineConfig::master_key()?),
//!     config.dispatcher.concurrency,
//! );
//!
//! let execution = store.create(input).await?;
//! let id = execution.id.clone();
//! tokio::spawn(async move { dispatcher.run(&id).await });
//!
//! let poller = StatusPoller::new(store, Duration::from_secs(2), Arc::new(TokioSleeper));
//! let terminal = poller.wait_for_terminal(&execution.id).await?;
//! println!("finished: {:?}", terminal.status);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod sdk;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::EngineConfig;
pub use core::dispatcher::BatchDispatcher;
pub use core::processor::ItemProcessor;
pub use core::types::{
    BatchInput, BatchItem, Execution, ExecutionStatus, ItemResult, ItemStatus, SharedParams,
};
pub use sdk::StatusPoller;
pub use storage::{ExecutionStore, InMemoryExecutionStore};
pub use utils::error::{EngineError, Result};
