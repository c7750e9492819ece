//! # FamTask API Server
//!
//! The FamTask API server: family household task management with join-code
//! membership, role-gated approvals, and a points ledger.
//!
//! ## Architecture
//!
//! Built with Axum over PostgreSQL (sqlx) and Redis (sessions):
//! - Cookie-carried server-side sessions with sliding 24h expiry
//! - Family-scoped operations resolved through the session's active family
//! - Transactional task→completion→approval→points pipeline
//! - Hourly background sweep of expired join requests
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p famtask-api
//! ```

use famtask_api::{
    app::{build_router, AppState},
    config::Config,
    sweep::ExpirySweeper,
};
use famtask_shared::{
    db::{self, pool::DatabaseConfig},
    session::SessionStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "famtask_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "FamTask API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    db::migrations::ensure_database_exists(&config.database.url).await?;

    let pool = db::create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    db::run_migrations(&pool).await?;

    let sessions = SessionStore::connect(&config.redis.url).await?;

    // Background sweep: runs once now, then hourly
    let sweeper = ExpirySweeper::new(pool.clone());
    let sweeper_shutdown = sweeper.shutdown_token();
    let sweeper_handle = tokio::spawn(sweeper.run());

    let bind_address = config.bind_address();
    let state = AppState::new(pool, sessions, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    sweeper_shutdown.cancel();
    let _ = sweeper_handle.await;

    tracing::info!("Server stopped");
    Ok(())
}
