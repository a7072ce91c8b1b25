use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    info!(database = config.mongodb.database(), "Connecting to MongoDB");

    // Retries with exponential backoff before giving up
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;

    let db = mongo_client.database(config.mongodb.database());

    info!("Connected to MongoDB");

    api::tasks::init_indexes(&db).await?;
    api::tasks::ensure_upload_dir(&config.upload).await?;

    let state = AppState {
        config,
        mongo_client,
        db,
    };

    // Task, image and readiness routes
    let api_routes = api::routes(&state);

    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes)?;

    // /health stays outside the docs router's layers
    let app = router.merge(health_router(state.config.app));

    info!("Starting Task Manager API with graceful shutdown (30s timeout)");

    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            drop(state.mongo_client);
            info!("MongoDB connection closed successfully");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Task Manager API shutdown complete");
    Ok(())
}
