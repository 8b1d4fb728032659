// Character API - Web Server

use anyhow::{Context, Result};
use character_api::{gate_from_config, init_logging, router, setup_database, AppState, Config};
use rusqlite::Connection;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env()?;

    // Open database (created on first run)
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {:?}", config.database_path))?;
    setup_database(&conn)?;
    tracing::info!(path = ?config.database_path, "database opened");

    if config.house_api_key.is_empty() {
        tracing::warn!("HOUSE_API_KEY is not set, house lookups will likely be rejected");
    }

    let gate = gate_from_config(&config)?;
    tracing::info!(
        cache = ?config.house_cache,
        authority = %config.house_api_url,
        timeout_secs = config.house_api_timeout.as_secs(),
        "house validation ready"
    );

    let app = router(AppState::new(conn, gate));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "server running, API under /api/v1/characters");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
