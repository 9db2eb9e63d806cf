//! Item processor
//!
//! Executes one batch item end-to-end: provider call under the retry policy,
//! artifact storage, and exactly one `ItemResult`. This layer never raises;
//! every failure mode is captured in the result and the batch moves on.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::credential::ResolvedCredential;
use crate::core::provider::{GenerationBackend, GenerationRequest};
use crate::core::retry::{RetryPolicy, Sleeper};
use crate::core::types::{BatchItem, ItemResult, SharedParams};
use crate::storage::ArtifactStore;

/// Processes single items against the generation backend
pub struct ItemProcessor {
    backend: Arc<dyn GenerationBackend>,
    artifacts: Arc<dyn ArtifactStore>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ItemProcessor {
    /// Create a processor over the given backend and artifact store
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            backend,
            artifacts,
            policy,
            sleeper,
        }
    }

    /// Process one item to exactly one result.
    pub async fn process(
        &self,
        execution_id: &str,
        index: usize,
        item: &BatchItem,
        params: &SharedParams,
        credential: &ResolvedCredential,
    ) -> ItemResult {
        let request = GenerationRequest {
            prompt: item.prompt.clone(),
            model: params.model.clone(),
            aspect_ratio: params.aspect_ratio.clone(),
            resolution: params.resolution.clone(),
            reference_images: item.reference_images.clone(),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(execution_id, index, attempt, "generation attempt");

            let error = match self.backend.generate(&request, credential.api_key()).await {
                Ok(payload) => {
                    return match self.artifacts.store(execution_id, index, &payload).await {
                        Ok(artifact_ref) => ItemResult::completed(index, artifact_ref, attempt),
                        Err(e) => {
                            warn!(execution_id, index, error = %e, "artifact storage failed");
                            ItemResult::failed(
                                index,
                                format!("generated image could not be stored: {}", e),
                                attempt,
                            )
                        }
                    };
                }
                Err(e) => e,
            };

            if self.policy.should_retry(&error, attempt) {
                let delay = self.policy.delay_after(attempt, &error);
                warn!(
                    execution_id,
                    index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient failure, backing off"
                );
                self.sleeper.sleep(delay).await;
                continue;
            }

            warn!(execution_id, index, attempt, error = %error, "item failed");
            return ItemResult::failed(index, error.to_string(), attempt);
        }
    }
}
