// API server binary
//
// Usage: cargo run --features api --bin api_server
// Optional: PLANT_DIAGNOSIS_CONFIG=config/plant_diagnosis.toml, DATA_DIR, PORT, LOCALE, HISTORY_BACKEND

use plant_diagnosis_rust::{create_router, AppConfig, AppState};
use std::net::{IpAddr, SocketAddr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_diagnosis_rust=info,tower_http=debug,axum=debug,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    let config = AppConfig::load()?;

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {}", config.data.data_dir.display());
    tracing::info!("  PORT: {}", config.server.port);
    tracing::info!("  LOCALE: {:?}", config.display.locale);
    tracing::info!("  HISTORY_BACKEND: {:?}", config.history.backend);

    let state = AppState::new(&config)?;
    let app = create_router(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server.host '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::new(host, config.server.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
