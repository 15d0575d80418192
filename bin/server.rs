// POS Ledger - Web Server
// REST API over the configured ledger (memory or SQLite)

use anyhow::{Context, Result};
use pos_ledger::api::{build_router, AppState};
use pos_ledger::{telemetry, Config, VERSION};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; real env vars still apply
    let _ = dotenvy::dotenv();
    telemetry::init();

    let config = Config::from_env()?;
    let ledger = config.open_ledger()?;
    info!(
        version = VERSION,
        store = ledger.kind(),
        db_path = %config.db_path.display(),
        "ledger ready"
    );

    let app = build_router(AppState::new(ledger));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
