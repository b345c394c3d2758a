// src/main.rs
use std::sync::Arc;

use axum_server::Handle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polls::config::Config;
use polls::db::{self, PgStore};
use polls::routes;
use polls::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("polls=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> polls::Result<()> {
    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    if config.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let state = AppState::new(Arc::new(PgStore::new(pool)));
    let cors = routes::cors_layer(config.cors_origin.as_deref())?;
    let app = routes::create_routes(state).layer(cors);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    let addr = config.bind_addr();
    info!(%addr, "server listening");
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
        handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
    }
}
