//! Shared test fixtures

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use genbatch::core::credential::CredentialResolver;
use genbatch::core::processor::ItemProcessor;
use genbatch::core::provider::{
    ArtifactPayload, GenerationBackend, GenerationRequest, ProviderError,
};
use genbatch::core::retry::{RetryPolicy, Sleeper};
use genbatch::core::types::{BatchInput, BatchItem, SharedParams};
use genbatch::core::dispatcher::BatchDispatcher;
use genbatch::storage::{ExecutionStore, InMemoryArtifactStore};
use genbatch::utils::crypto::encrypt_data;

/// Master key used by every test
pub const TEST_MASTER_KEY: &[u8] = b"test-master-key";

/// A provider credential encrypted under [`TEST_MASTER_KEY`]
pub fn encrypted_test_credential() -> String {
    encrypt_data(TEST_MASTER_KEY, "sk-test-credential").unwrap()
}

/// Batch input over the given prompts, with a valid encrypted credential
pub fn batch_input(prompts: &[&str]) -> BatchInput {
    BatchInput {
        items: prompts
            .iter()
            .map(|p| BatchItem {
                prompt: p.to_string(),
                reference_images: vec![],
            })
            .collect(),
        params: SharedParams::default(),
        encrypted_credential: Some(encrypted_test_credential()),
    }
}

/// Sleeper that returns immediately; retry tests assert on outcomes, not
/// wall-clock delays
#[derive(Default)]
pub struct NoDelaySleeper;

#[async_trait]
impl Sleeper for NoDelaySleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Backend that succeeds unless the prompt has a scripted failure. A
/// failure count per prompt lets tests script "fail twice, then succeed".
pub struct StubBackend {
    /// prompt -> (error, number of calls that fail before succeeding;
    /// `u32::MAX` for always)
    failures: Mutex<HashMap<String, (ProviderError, u32)>>,
    calls: AtomicU32,
}

impl StubBackend {
    pub fn succeeding() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Script the given prompt to always fail with `error`
    pub fn failing(prompt: &str, error: ProviderError) -> Self {
        let backend = Self::succeeding();
        backend.fail_always(prompt, error);
        backend
    }

    pub fn fail_always(&self, prompt: &str, error: ProviderError) {
        self.failures
            .lock()
            .insert(prompt.to_string(), (error, u32::MAX));
    }

    /// Script the given prompt to fail `times` calls, then succeed
    pub fn fail_times(&self, prompt: &str, error: ProviderError, times: u32) {
        self.failures
            .lock()
            .insert(prompt.to_string(), (error, times));
    }

    /// Total provider calls made across all items
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _api_key: &str,
    ) -> Result<ArtifactPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock();
        if let Some((error, remaining)) = failures.get_mut(&request.prompt) {
            if *remaining > 0 {
                *remaining = remaining.saturating_sub(1);
                return Err(error.clone());
            }
        }
        Ok(ArtifactPayload {
            data: "QUJD".to_string(),
            mime_type: "image/png".to_string(),
        })
    }
}

/// Backend that requests cancellation on the owning execution as soon as the
/// first generation call completes. Deterministically exercises the
/// "cancel observed between items" contract.
pub struct CancelAfterFirstBackend {
    store: Arc<dyn ExecutionStore>,
    execution_id: Mutex<Option<String>>,
    calls: AtomicU32,
}

impl CancelAfterFirstBackend {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self {
            store,
            execution_id: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// Must be called with the execution id before the dispatcher runs
    pub fn arm(&self, execution_id: &str) {
        *self.execution_id.lock() = Some(execution_id.to_string());
    }
}

#[async_trait]
impl GenerationBackend for CancelAfterFirstBackend {
    async fn generate(
        &self,
        _request: &GenerationRequest,
        _api_key: &str,
    ) -> Result<ArtifactPayload, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            let id = self.execution_id.lock().clone();
            if let Some(id) = id {
                let _ = self.store.request_cancel(&id).await;
            }
        }
        Ok(ArtifactPayload {
            data: "QUJD".to_string(),
            mime_type: "image/png".to_string(),
        })
    }
}

/// Assemble a dispatcher over the given store and backend, with instant
/// retry backoff and an in-memory artifact store.
pub fn build_dispatcher(
    store: Arc<dyn ExecutionStore>,
    backend: Arc<dyn GenerationBackend>,
    concurrency: usize,
) -> BatchDispatcher {
    let processor = Arc::new(ItemProcessor::new(
        backend,
        Arc::new(InMemoryArtifactStore::new()),
        RetryPolicy::default(),
        Arc::new(NoDelaySleeper),
    ));
    BatchDispatcher::new(
        store,
        processor,
        CredentialResolver::new(TEST_MASTER_KEY),
        concurrency,
    )
}
