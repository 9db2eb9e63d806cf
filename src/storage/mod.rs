//! Execution and artifact storage
//!
//! The execution store is the single source of truth for job state. Terminal
//! records are immutable: repeated terminal writes are idempotent no-ops, so
//! a crashed-and-restarted dispatcher cannot resurrect a finished job.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::core::provider::ArtifactPayload;
use crate::core::types::{BatchInput, Execution, ExecutionStatus, ItemResult};
use crate::utils::error::{EngineError, Result};

/// Durable record of job state, read by the poller and written by exactly
/// one dispatcher per execution.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Create a new pending execution for the given input
    async fn create(&self, input: BatchInput) -> Result<Execution>;

    /// Read the full execution record; side-effect free
    async fn get(&self, id: &str) -> Result<Option<Execution>>;

    /// Atomically transition `pending -> processing`, stamping `started_at`
    /// once, and return the input for the item loop. Fails on any other
    /// starting state so two dispatchers can never own one job.
    async fn claim(&self, id: &str) -> Result<BatchInput>;

    /// Upsert one item result by index and recompute progress. Ignored on
    /// terminal records.
    async fn record_item_result(&self, id: &str, result: ItemResult) -> Result<()>;

    /// Mark the job completed. Idempotent no-op on terminal records.
    async fn mark_completed(&self, id: &str) -> Result<()>;

    /// Mark the job failed with a job-level reason. Idempotent no-op on
    /// terminal records.
    async fn mark_failed(&self, id: &str, error: &str) -> Result<()>;

    /// Set the advisory cancellation flag. Returns whether the flag was set
    /// (false once the record is terminal).
    async fn request_cancel(&self, id: &str) -> Result<bool>;

    /// Whether cancellation has been requested
    async fn is_cancel_requested(&self, id: &str) -> Result<bool>;
}

/// In-memory execution store
#[derive(Default)]
pub struct InMemoryExecutionStore {
    executions: DashMap<String, Execution>,
}

impl InMemoryExecutionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn with_execution<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Execution) -> Result<T>,
    ) -> Result<T> {
        let mut entry = self
            .executions
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {}", id)))?;
        f(entry.value_mut())
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, input: BatchInput) -> Result<Execution> {
        let execution = Execution::new(input);
        self.executions
            .insert(execution.id.clone(), execution.clone());
        Ok(execution)
    }

    async fn get(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self.executions.get(id).map(|e| e.value().clone()))
    }

    async fn claim(&self, id: &str) -> Result<BatchInput> {
        self.with_execution(id, |execution| {
            if execution.status != ExecutionStatus::Pending {
                return Err(EngineError::Conflict(format!(
                    "execution {} is not pending (status: {:?})",
                    id, execution.status
                )));
            }
            execution.status = ExecutionStatus::Processing;
            execution.started_at = Some(Utc::now());
            Ok(execution.input.clone())
        })
    }

    async fn record_item_result(&self, id: &str, result: ItemResult) -> Result<()> {
        self.with_execution(id, |execution| {
            if execution.is_terminal() {
                debug!(execution_id = id, "ignoring item write to terminal execution");
                return Ok(());
            }
            match execution.results.iter_mut().find(|r| r.index == result.index) {
                Some(existing) => *existing = result,
                None => execution.results.push(result),
            }
            execution.results.sort_by_key(|r| r.index);

            let total = execution.input.items.len();
            if total > 0 {
                let done = execution.results.len();
                execution.progress = ((done as f64 / total as f64) * 100.0).round() as u8;
            }
            Ok(())
        })
    }

    async fn mark_completed(&self, id: &str) -> Result<()> {
        self.with_execution(id, |execution| {
            if execution.is_terminal() {
                debug!(execution_id = id, "ignoring terminal write to terminal execution");
                return Ok(());
            }
            execution.status = ExecutionStatus::Completed;
            execution.progress = 100;
            execution.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        self.with_execution(id, |execution| {
            if execution.is_terminal() {
                debug!(execution_id = id, "ignoring terminal write to terminal execution");
                return Ok(());
            }
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(error.to_string());
            execution.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn request_cancel(&self, id: &str) -> Result<bool> {
        self.with_execution(id, |execution| {
            if execution.is_terminal() {
                return Ok(false);
            }
            execution.cancel_requested = true;
            Ok(true)
        })
    }

    async fn is_cancel_requested(&self, id: &str) -> Result<bool> {
        self.with_execution(id, |execution| Ok(execution.cancel_requested))
    }
}

/// Stored artifact destination. The item processor writes generated images
/// here and records only the returned reference on the execution.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store one artifact and return its reference
    async fn store(
        &self,
        execution_id: &str,
        index: usize,
        payload: &ArtifactPayload,
    ) -> Result<String>;

    /// Fetch a stored artifact by reference
    async fn get(&self, artifact_ref: &str) -> Result<Option<ArtifactPayload>>;
}

/// In-memory artifact store handing out `memory://` references
#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<String, ArtifactPayload>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(
        &self,
        execution_id: &str,
        index: usize,
        payload: &ArtifactPayload,
    ) -> Result<String> {
        let artifact_ref = format!("memory://executions/{}/items/{}", execution_id, index);
        self.artifacts
            .write()
            .insert(artifact_ref.clone(), payload.clone());
        Ok(artifact_ref)
    }

    async fn get(&self, artifact_ref: &str) -> Result<Option<ArtifactPayload>> {
        Ok(self.artifacts.read().get(artifact_ref).cloned())
    }
}
