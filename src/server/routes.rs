//! Execution routes
//!
//! Submit returns immediately with an execution id; the dispatcher runs in a
//! background task. Status reads are side-effect free and safe at arbitrary
//! frequency. Cancel sets the advisory flag and returns without waiting.

use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Serialize;
use tracing::{error, info};

use crate::core::types::{BatchInput, Execution, ExecutionCounts};
use crate::server::state::AppState;
use crate::utils::error::EngineError;

/// Standard API response envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Body of a successful submit
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Identifier to poll and cancel with
    pub execution_id: String,
}

/// Full execution record plus derived counts
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// The execution record
    #[serde(flatten)]
    pub execution: Execution,
    /// Per-item success/failure counts
    pub counts: ExecutionCounts,
}

/// Body of a cancel call
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Whether the flag was set; false once the execution is terminal
    pub cancel_requested: bool,
}

/// Configure execution routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1/executions")
            .route("", web::post().to(submit_execution))
            .route("/{id}", web::get().to(get_execution))
            .route("/{id}/cancel", web::post().to(cancel_execution)),
    );
}

/// Accept a batch, create the pending record and spawn its dispatcher.
pub async fn submit_execution(
    state: web::Data<AppState>,
    input: web::Json<BatchInput>,
) -> ActixResult<HttpResponse, EngineError> {
    let execution = state.store.create(input.into_inner()).await?;
    info!(
        execution_id = %execution.id,
        items = execution.input.items.len(),
        "execution submitted"
    );

    let dispatcher = state.dispatcher.clone();
    let execution_id = execution.id.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.run(&execution_id).await {
            error!(execution_id, error = %e, "dispatcher run failed");
        }
    });

    Ok(HttpResponse::Accepted().json(ApiResponse::success(SubmitResponse {
        execution_id: execution.id,
    })))
}

/// Read the full execution record. No side effects.
pub async fn get_execution(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, EngineError> {
    let id = path.into_inner();
    let execution = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("execution {}", id)))?;

    let counts = execution.counts();
    Ok(HttpResponse::Ok().json(ApiResponse::success(StatusResponse { execution, counts })))
}

/// Set the cancellation flag; returns immediately without waiting for the
/// dispatcher to observe it.
pub async fn cancel_execution(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, EngineError> {
    let id = path.into_inner();
    let cancel_requested = state.store.request_cancel(&id).await?;
    info!(execution_id = %id, cancel_requested, "cancellation requested");

    Ok(HttpResponse::Ok().json(ApiResponse::success(CancelResponse { cancel_requested })))
}
