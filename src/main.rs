use energy_api::repositories::{MeterRepository, ReadingRepository};
use energy_api::services::EnergyService;
use energy_api::{create_pool, routes, Config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting energy-api");

    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let config = Config::load(&cfg_path)?;
    info!("Configuration loaded");

    let pool = create_pool(&config.database).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("Connected to database");

    let service = EnergyService::new(
        Arc::new(ReadingRepository::new(pool.clone())),
        Arc::new(MeterRepository::new(pool)),
        config.engine.clone(),
    );

    let router = routes::create_router(service);
    let addr = format!("{}:{}", config.api.host, config.api.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("API server listening on {}", addr);

    // Set up graceful shutdown
    let serve = axum::serve(listener, router);
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received");
    };

    if let Err(e) = serve.with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %e, "API server error");
    }

    info!("Application shutdown complete");
    Ok(())
}
