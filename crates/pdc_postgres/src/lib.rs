//! pdc_postgres: PostgreSQL adapter for the catalog.
//!
//! Implements `pdc_core::ports` with sqlx. The schema lives in
//! `migrations/` and is applied with [`migrate`] at server startup.

pub mod rows;
mod store;

pub use store::{PgStore, PgTx};

use sqlx::migrate::Migrator;
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending schema migrations.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("catalog schema migrations applied");
    Ok(())
}
