//! genbatch server binary

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use genbatch::config::EngineConfig;
use genbatch::server;

#[derive(Parser, Debug)]
#[command(name = "genbatch-server", about = "Batch execution engine for generative image APIs")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "GENBATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    match server::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
