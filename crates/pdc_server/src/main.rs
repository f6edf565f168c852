//! pdc_server: standalone REST server for the PDC catalog.
//!
//! Configuration comes from the environment (and `.env`), see
//! [`pdc_server::config`].

use std::sync::Arc;

use anyhow::Context;
use pdc_core::memory::MemoryStore;
use pdc_core::ports::CatalogStore;
use pdc_core::service::{CatalogService, CatalogServiceImpl};
use pdc_postgres::PgStore;
use pdc_server::config::ServerConfig;
use pdc_server::middleware::jwt::JwtConfig;
use pdc_server::router::build_router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pdc_server=debug".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to database")?;
            tracing::info!("Connected to database");
            pdc_postgres::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::info!("PDC_DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let service: Arc<dyn CatalogService> = Arc::new(CatalogServiceImpl::new(store));
    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(service, jwt_config, config.pages.clone());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("pdc_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
