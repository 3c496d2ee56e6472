use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tribune_server::{AppState, InMemoryDebateDirectory, RoomManager, ServerConfig, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(config.log_json);

    info!("Initializing debate room coordinator...");

    let directory = match &config.debates_file {
        Some(path) => Arc::new(InMemoryDebateDirectory::load(path).await?),
        None => Arc::new(InMemoryDebateDirectory::new()),
    };

    let room_manager = RoomManager::new(
        directory.clone(),
        config.room_config(),
        config.ice_servers(),
    );

    let app = router(AppState {
        room_manager,
        directory,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!("Room coordinator listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
