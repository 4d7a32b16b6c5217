use anyhow::Result;
use axum_observability::{create_router, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber to log to stdout
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let app = create_router()?;

    let endpoint = format!("0.0.0.0:{}", config.server.port);

    info!("Server running on port {}", config.server.port);
    info!(
        "Starting Observability API server v{}...",
        env!("CARGO_PKG_VERSION")
    );

    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
