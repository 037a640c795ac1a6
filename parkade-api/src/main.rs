use anyhow::Context;
use parkade_api::{app, AppState, AuthConfig};
use parkade_store::JsonFileStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkade_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parkade_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Parkade API on port {}", config.server.port);

    let store = JsonFileStore::new(&config.storage.data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {}", config.storage.data_dir))?;
    tracing::info!("Persisting documents under {}", store.dir().display());

    let app_state = AppState::load(
        Arc::new(store),
        &config.business_rules,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    )
    .await?;

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
