//! Fitness Predictor - prediction service binary
//!
//! Artifacts are loaded before the listener is bound; a load failure exits
//! the process without ever accepting a request.

use anyhow::Result;
use fitness_predictor::{api, AppState, ServerConfig, VERSION};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fitness-predictor");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifact_dir = %config.artifact_dir.display(),
        variants = %config.variants,
        "Predictor configured"
    );

    let state = match AppState::load(&config, VERSION) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Startup aborted");
            return Err(e);
        }
    };

    state.logger.log_startup(VERSION, &state.registry.variants());
    let logger = state.logger.clone();

    api::serve(config.api_port, Arc::new(state)).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
