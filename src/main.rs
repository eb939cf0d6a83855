use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use siga_api::config::{self, StorageBackend};
use siga_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use siga_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("siga_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting SIGA API in {:?} mode with {:?} storage", config.environment, config.storage);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }
    if siga_api::is_production!() && config.storage == StorageBackend::Memory {
        anyhow::bail!("In-memory storage is not allowed in production");
    }

    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = match config.storage {
        StorageBackend::Memory => (Arc::new(MemoryStore::new()) as Arc<dyn Store>, None),
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("connecting to PostgreSQL")?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await.context("running migrations")?;
            }
            (Arc::new(PgStore::new(pool.clone())) as Arc<dyn Store>, Some(pool))
        }
    };

    let state = AppState::new(store, config.enrollment.completion_policy);

    if let Some(admin) = &config.bootstrap {
        let user = state
            .authenticator
            .ensure_admin(&admin.email, &admin.password)
            .await
            .context("creating bootstrap admin")?;
        tracing::info!("Bootstrap admin ready: {}", user.email);
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("SIGA API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pool) = pool {
        DatabaseManager::close(pool).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
