use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info};

use crate_datasource::config::{AppConfig, CliArgs};
use crate_datasource::db::db_pool::DuckDBConnectionManager;
use crate_datasource::util::logging::init_tracing;
use crate_datasource::web;
use crate_datasource::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool on {}",
        config.database.connection_string
    );
    let db_manager = DuckDBConnectionManager::new(config.database.connection_string.clone())?;
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;

    let app_state = Arc::new(AppState::with_pool(config.clone(), pool));

    // Report store connectivity up front, but keep serving either way
    match app_state.datasource.test_datasource().await {
        Ok(health) => info!("{}", health.message),
        Err(e) => error!("Datasource check failed: {}", e),
    }

    // Start the web server
    info!("Starting datasource server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
