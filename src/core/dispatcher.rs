//! Batch dispatcher
//!
//! One dispatcher run owns one execution for its entire lifetime. It claims
//! the pending record, resolves the shared credential once, drives every item
//! through the processor (serially or with a bounded worker pool), and
//! decides the terminal state. All record writes funnel through this task:
//! workers only hand results back over a channel.
//!
//! Terminal rule: a batch where items failed is still `completed`. `failed`
//! is reserved for job-level faults: credential resolution, an empty batch,
//! or user cancellation.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use crate::core::credential::CredentialResolver;
use crate::core::processor::ItemProcessor;
use crate::core::types::{BatchInput, BatchItem, ItemStatus};
use crate::storage::ExecutionStore;
use crate::utils::error::Result;

/// Job-level error recorded when the user cancels mid-batch
pub const CANCELLED_BY_USER: &str = "execution cancelled by user request";

/// Drives one execution from `pending` to a terminal state
pub struct BatchDispatcher {
    store: Arc<dyn ExecutionStore>,
    processor: Arc<ItemProcessor>,
    resolver: CredentialResolver,
    concurrency: usize,
}

impl BatchDispatcher {
    /// Create a dispatcher. `concurrency` bounds the worker pool; 1 means
    /// strictly serial processing.
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        processor: Arc<ItemProcessor>,
        resolver: CredentialResolver,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            processor,
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// Run one execution to a terminal state. Item failures never surface
    /// here; the returned error covers store access faults only.
    pub async fn run(&self, execution_id: &str) -> Result<()> {
        let input = self.store.claim(execution_id).await?;
        info!(execution_id, items = input.items.len(), "execution claimed");

        if input.items.is_empty() {
            warn!(execution_id, "rejecting empty batch");
            return self
                .store
                .mark_failed(execution_id, "batch contains no items")
                .await;
        }

        // Resolved once per job, before any item is attempted. Failure here
        // is a job-level failure with zero results.
        let credential = match self.resolver.resolve(input.encrypted_credential.as_deref()) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(execution_id, error = %e, "credential resolution failed");
                return self
                    .store
                    .mark_failed(execution_id, &format!("credential resolution failed: {}", e))
                    .await;
            }
        };

        let total = input.items.len();
        let dispatched = if self.concurrency == 1 {
            self.run_serial(execution_id, &input, &credential).await?
        } else {
            self.run_pooled(execution_id, &input, &credential).await?
        };

        if dispatched < total {
            info!(execution_id, dispatched, total, "execution cancelled");
            self.store.mark_failed(execution_id, CANCELLED_BY_USER).await?;
        } else {
            self.store.mark_completed(execution_id).await?;
            if let Some(execution) = self.store.get(execution_id).await? {
                let counts = execution.counts();
                info!(
                    execution_id,
                    completed = counts.completed,
                    failed = counts.failed,
                    "execution completed"
                );
            }
        }
        Ok(())
    }

    /// Serial item loop: cancellation is observed before each item.
    async fn run_serial(
        &self,
        execution_id: &str,
        input: &BatchInput,
        credential: &crate::core::credential::ResolvedCredential,
    ) -> Result<usize> {
        let mut dispatched = 0;
        for (index, item) in input.items.iter().enumerate() {
            if self.store.is_cancel_requested(execution_id).await? {
                break;
            }
            dispatched += 1;
            let result = self
                .processor
                .process(execution_id, index, item, &input.params, credential)
                .await;
            self.record(execution_id, result).await?;
        }
        Ok(dispatched)
    }

    /// Bounded worker pool. The feeder checks the cancellation flag before
    /// handing each item to the pool; this task stays the single writer by
    /// draining the result channel itself.
    async fn run_pooled(
        &self,
        execution_id: &str,
        input: &BatchInput,
        credential: &crate::core::credential::ResolvedCredential,
    ) -> Result<usize> {
        let workers = self.concurrency.min(input.items.len());
        let (task_tx, task_rx) = mpsc::channel::<(usize, BatchItem)>(workers);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::channel(input.items.len());

        for _ in 0..workers {
            let task_rx = Arc::clone(&task_rx);
            let result_tx = result_tx.clone();
            let processor = Arc::clone(&self.processor);
            let params = input.params.clone();
            let credential = credential.clone();
            let execution_id = execution_id.to_string();
            tokio::spawn(async move {
                loop {
                    let next = { task_rx.lock().await.recv().await };
                    let Some((index, item)) = next else { break };
                    let result = processor
                        .process(&execution_id, index, &item, &params, &credential)
                        .await;
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let feeder = {
            let store = Arc::clone(&self.store);
            let execution_id = execution_id.to_string();
            let items = input.items.clone();
            tokio::spawn(async move {
                let mut dispatched = 0;
                for (index, item) in items.into_iter().enumerate() {
                    match store.is_cancel_requested(&execution_id).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => {
                            error!(execution_id, error = %e, "cancel check failed");
                            break;
                        }
                    }
                    if task_tx.send((index, item)).await.is_err() {
                        break;
                    }
                    dispatched += 1;
                }
                dispatched
            })
        };

        // Single writer: every record update happens on this task.
        while let Some(result) = result_rx.recv().await {
            self.record(execution_id, result).await?;
        }

        let dispatched = feeder.await.unwrap_or(0);
        Ok(dispatched)
    }

    async fn record(&self, execution_id: &str, result: crate::core::types::ItemResult) -> Result<()> {
        if result.status == ItemStatus::Failed {
            warn!(
                execution_id,
                index = result.index,
                attempts = result.attempts,
                "item failed, batch continues"
            );
        }
        self.store.record_item_result(execution_id, result).await
    }
}
