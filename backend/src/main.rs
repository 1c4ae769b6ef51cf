use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use baby_tracker_backend::config::AppConfig;
use baby_tracker_backend::{create_router, initialize_backend};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .init();

    let app_state = initialize_backend(&config).await?;
    if let Err(e) = app_state.settings_service.refresh().await {
        tracing::warn!("Initial admin settings refresh failed: {}", e);
    }
    app_state.settings_service.start();

    let app = create_router(app_state.clone(), &config.allowed_origin)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    app_state.settings_service.stop();
    Ok(())
}
