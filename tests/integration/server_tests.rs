//! HTTP API tests
//!
//! Exercises the submit / poll / cancel surface end to end with a stub
//! backend, the way a polling client uses it.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, test, web};
use serde_json::{Value, json};

use genbatch::config::EngineConfig;
use genbatch::core::provider::GenerationBackend;
use genbatch::server::routes::configure_routes;
use genbatch::server::state::AppState;
use genbatch::storage::{InMemoryArtifactStore, InMemoryExecutionStore};

use crate::common::{StubBackend, TEST_MASTER_KEY, encrypted_test_credential};

fn app_state(backend: Arc<dyn GenerationBackend>) -> AppState {
    AppState::new(
        Arc::new(InMemoryExecutionStore::new()),
        Arc::new(InMemoryArtifactStore::new()),
        backend,
        TEST_MASTER_KEY.to_vec(),
        &EngineConfig::default(),
    )
}

fn submit_body(prompts: &[&str]) -> Value {
    json!({
        "items": prompts.iter().map(|p| json!({"prompt": p})).collect::<Vec<_>>(),
        "params": {},
        "encrypted_credential": encrypted_test_credential(),
    })
}

/// Poll GET /v1/executions/{id} until the record is terminal
async fn poll_until_terminal<S>(app: &S, execution_id: &str) -> Value
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
{
    for _ in 0..100 {
        let req = test::TestRequest::get()
            .uri(&format!("/v1/executions/{}", execution_id))
            .to_request();
        let body: Value = test::call_and_read_body_json(app, req).await;
        let status = body["data"]["status"].as_str().unwrap().to_string();
        if status == "completed" || status == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {} never reached a terminal status", execution_id);
}

#[actix_web::test]
async fn test_submit_then_poll_to_completion() {
    let state = app_state(Arc::new(StubBackend::succeeding()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/executions")
        .set_json(submit_body(&["a", "b"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 202);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let execution_id = body["data"]["execution_id"].as_str().unwrap().to_string();

    let terminal = poll_until_terminal(&app, &execution_id).await;
    assert_eq!(terminal["data"]["status"], "completed");
    assert_eq!(terminal["data"]["progress"], 100);
    assert_eq!(terminal["data"]["counts"]["completed"], 2);
    assert_eq!(terminal["data"]["counts"]["failed"], 0);
    assert_eq!(terminal["data"]["results"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_missing_credential_surfaces_as_failed() {
    let state = app_state(Arc::new(StubBackend::succeeding()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let mut body = submit_body(&["a"]);
    body.as_object_mut().unwrap().remove("encrypted_credential");
    let req = test::TestRequest::post()
        .uri("/v1/executions")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 202);

    let body: Value = test::read_body_json(resp).await;
    let execution_id = body["data"]["execution_id"].as_str().unwrap().to_string();

    let terminal = poll_until_terminal(&app, &execution_id).await;
    assert_eq!(terminal["data"]["status"], "failed");
    assert!(
        terminal["data"]["error"]
            .as_str()
            .unwrap()
            .contains("credential")
    );
    assert_eq!(terminal["data"]["results"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_get_unknown_execution_is_404() {
    let state = app_state(Arc::new(StubBackend::succeeding()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/v1/executions/does-not-exist")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_cancel_on_terminal_execution_reports_false() {
    let state = app_state(Arc::new(StubBackend::succeeding()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/executions")
        .set_json(submit_body(&["a"]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let execution_id = body["data"]["execution_id"].as_str().unwrap().to_string();
    poll_until_terminal(&app, &execution_id).await;

    let req = test::TestRequest::post()
        .uri(&format!("/v1/executions/{}/cancel", execution_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["cancel_requested"], false);
}

#[actix_web::test]
async fn test_cancel_unknown_execution_is_404() {
    let state = app_state(Arc::new(StubBackend::succeeding()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/executions/does-not-exist/cancel")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
