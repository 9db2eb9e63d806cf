//! Execution and item types
//!
//! One `Execution` tracks one submitted batch from `pending` through a
//! terminal `completed` or `failed`. Per-item outcomes live in ordered
//! `ItemResult`s; item failure never changes the job-level status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job-level status of an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Created, not yet claimed by a dispatcher
    Pending,
    /// Claimed; items are being processed
    Processing,
    /// Every item has a result (failed items included)
    Completed,
    /// Job-level fault: credential, empty batch, or cancellation
    Failed,
}

impl ExecutionStatus {
    /// Terminal states are absorbing
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Outcome status of one item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Artifact was generated and stored
    Completed,
    /// All attempts exhausted or a non-retriable failure
    Failed,
}

/// One generation request within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Text prompt for this item
    pub prompt: String,
    /// Optional reference images as `data:` URLs
    #[serde(default)]
    pub reference_images: Vec<String>,
}

/// Parameters shared by every item in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedParams {
    /// Provider model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Aspect ratio, e.g. "1:1" or "16:9"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Output resolution, e.g. "1K" or "2K"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

fn default_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

impl Default for SharedParams {
    fn default() -> Self {
        Self {
            model: default_model(),
            aspect_ratio: None,
            resolution: None,
        }
    }
}

/// The original batch request, kept verbatim on the execution record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    /// Items to process, in submission order
    pub items: Vec<BatchItem>,
    /// Shared generation parameters
    #[serde(default)]
    pub params: SharedParams,
    /// At-rest-encrypted provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_credential: Option<String>,
}

/// Recorded outcome of one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// Position in the original input list
    pub index: usize,
    /// Item outcome
    pub status: ItemStatus,
    /// Reference to the stored artifact, present iff completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    /// Failure reason, present iff failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of provider calls made for this item
    pub attempts: u32,
}

impl ItemResult {
    /// Successful outcome with a stored artifact
    pub fn completed(index: usize, artifact_ref: String, attempts: u32) -> Self {
        Self {
            index,
            status: ItemStatus::Completed,
            artifact_ref: Some(artifact_ref),
            error_message: None,
            attempts,
        }
    }

    /// Failed outcome with a user-facing reason
    pub fn failed(index: usize, error_message: impl Into<String>, attempts: u32) -> Self {
        Self {
            index,
            status: ItemStatus::Failed,
            artifact_ref: None,
            error_message: Some(error_message.into()),
            attempts,
        }
    }
}

/// Per-item success/failure counts derived from results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionCounts {
    /// Items in the batch
    pub total: usize,
    /// Items with a completed result
    pub completed: usize,
    /// Items with a failed result
    pub failed: usize,
}

/// One batch job: status, progress, results and timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Opaque unique identifier
    pub id: String,
    /// Job-level status
    pub status: ExecutionStatus,
    /// 0-100, monotonically non-decreasing while processing
    pub progress: u8,
    /// The original batch request
    pub input: BatchInput,
    /// Ordered item results, upsert-by-index during processing
    pub results: Vec<ItemResult>,
    /// Job-level failure summary; never set for item-level failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Set once when the dispatcher claims the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set once when the job reaches a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Advisory cancellation flag, observed between items
    #[serde(default)]
    pub cancel_requested: bool,
}

impl Execution {
    /// Create a new pending execution for the given input
    pub fn new(input: BatchInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: ExecutionStatus::Pending,
            progress: 0,
            input,
            results: Vec::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            cancel_requested: false,
        }
    }

    /// Whether the execution reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Derive success/failure counts from recorded results
    pub fn counts(&self) -> ExecutionCounts {
        let completed = self
            .results
            .iter()
            .filter(|r| r.status == ItemStatus::Completed)
            .count();
        let failed = self
            .results
            .iter()
            .filter(|r| r.status == ItemStatus::Failed)
            .count();
        ExecutionCounts {
            total: self.input.items.len(),
            completed,
            failed,
        }
    }

    /// Wall-clock duration, available once terminal
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }
}
