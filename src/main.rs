use anyhow::Context;
use tracing_subscriber::EnvFilter;

use notedly_api::app::{router, AppState};
use notedly_api::config;
use notedly_api::database::DatabaseManager;
use notedly_api::session::spawn_purge_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Notedly API in {:?} mode", config.environment);

    let backends = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    spawn_purge_task(
        backends.sessions.clone(),
        std::time::Duration::from_secs(config.session.purge_interval_secs.max(1)),
    );

    let state = AppState::new(config.clone(), backends)?;
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        "Notedly API listening on http://{}{}",
        bind_addr,
        config.server.graphql_path
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
