//! HTTP surface for the engine

pub mod routes;
pub mod state;

use actix_web::{App, HttpServer, web};
use tracing::info;

use crate::config::EngineConfig;
use crate::utils::error::Result;
use state::AppState;

/// Build the application state and run the HTTP server until shutdown.
pub async fn run_server(config: EngineConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let bind = (config.server.host.clone(), config.server.port);
    info!(host = %bind.0, port = bind.1, "starting genbatch server");

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure_routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
