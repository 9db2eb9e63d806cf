//! Status poller
//!
//! Client-side contract over the execution store: fetch the record on a
//! fixed interval until a terminal status is read, derive elapsed and
//! estimated-remaining time, and forward advisory cancellation. The poller
//! never mutates execution state beyond the cancel flag, and it holds no
//! ambient "current job"; every call takes an explicit execution id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::core::retry::Sleeper;
use crate::core::types::{Execution, ExecutionCounts, ExecutionStatus};
use crate::storage::ExecutionStore;
use crate::utils::error::{EngineError, Result};

/// One observed point-in-time view of an execution
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    /// Job-level status at observation time
    pub status: ExecutionStatus,
    /// 0-100
    pub progress: u8,
    /// Per-item success/failure counts
    pub counts: ExecutionCounts,
    /// Time since the dispatcher claimed the job; `None` before that
    pub elapsed: Option<Duration>,
    /// Naive linear estimate; `None` until at least one item has a result
    /// or once the job is terminal
    pub estimated_remaining: Option<Duration>,
    /// Job-level failure summary
    pub error: Option<String>,
}

impl PollSnapshot {
    /// Derive a snapshot from an execution record
    pub fn from_execution(execution: &Execution) -> Self {
        let counts = execution.counts();
        let elapsed = execution.started_at.map(|started| {
            let end = execution.finished_at.unwrap_or_else(Utc::now);
            (end - started).to_std().unwrap_or_default()
        });

        let done = counts.completed + counts.failed;
        let estimated_remaining = match (elapsed, done) {
            (Some(elapsed), done) if done > 0 && !execution.is_terminal() => {
                let remaining = counts.total.saturating_sub(done);
                let per_item = elapsed.as_secs_f64() / done as f64;
                Some(Duration::from_secs_f64(per_item * remaining as f64))
            }
            _ => None,
        };

        Self {
            status: execution.status,
            progress: execution.progress,
            counts,
            elapsed,
            estimated_remaining,
            error: execution.error.clone(),
        }
    }
}

/// Polls an execution until it reaches a terminal state
pub struct StatusPoller {
    store: Arc<dyn ExecutionStore>,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl StatusPoller {
    /// Create a poller with a fixed polling interval
    pub fn new(store: Arc<dyn ExecutionStore>, interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            store,
            interval,
            sleeper,
        }
    }

    /// Read one snapshot; side-effect free, safe at arbitrary frequency.
    pub async fn poll_once(&self, execution_id: &str) -> Result<PollSnapshot> {
        let execution = self
            .store
            .get(execution_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("execution {}", execution_id)))?;
        Ok(PollSnapshot::from_execution(&execution))
    }

    /// Poll on the fixed interval until a terminal status is read, then stop
    /// permanently and return the final record.
    pub async fn wait_for_terminal(&self, execution_id: &str) -> Result<Execution> {
        loop {
            let execution = self
                .store
                .get(execution_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("execution {}", execution_id)))?;

            if execution.is_terminal() {
                debug!(execution_id, status = ?execution.status, "terminal status observed");
                return Ok(execution);
            }

            debug!(execution_id, progress = execution.progress, "still processing");
            self.sleeper.sleep(self.interval).await;
        }
    }

    /// Request cancellation. Advisory: no new item starts after the
    /// dispatcher observes the flag, but the in-flight item finishes
    /// naturally. Returns whether the flag was set.
    pub async fn request_cancel(&self, execution_id: &str) -> Result<bool> {
        self.store.request_cancel(execution_id).await
    }
}
