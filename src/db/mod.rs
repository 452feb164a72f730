//! Database module

pub mod error;
pub mod memory;
pub mod postgres;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::{EntityRow, TableSpec};

pub use error::{ConstraintKind, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgMasterDataStore;

/// Counts reported by a committed bulk replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub imported: u64,
    /// Rows removed from the table before inserting the batch
    pub replaced: u64,
    /// Vessels whose reference to a removed key was cleared
    pub references_cleared: u64,
}

/// Counts reported by a committed delete-all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
    pub references_cleared: u64,
}

/// Storage backend for master data tables (Postgres, in-memory).
///
/// `replace_all` and `delete_all` are atomic: either every step is visible
/// afterwards or none is.
#[async_trait]
pub trait MasterDataStore: Send + Sync {
    /// All rows of a table in display order
    async fn list(&self, table: &'static TableSpec) -> Result<Vec<EntityRow>, StoreError>;

    /// Replace the table contents with `rows`, clearing vessel references to
    /// keys that disappear
    async fn replace_all(
        &self,
        table: &'static TableSpec,
        rows: &[EntityRow],
    ) -> Result<ReplaceOutcome, StoreError>;

    /// Delete every row of the table, clearing all vessel references to it
    async fn delete_all(&self, table: &'static TableSpec) -> Result<DeleteOutcome, StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Create a database connection pool
pub async fn create_pool(database_url: &str, config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Run embedded database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    let migrator = sqlx::migrate!("./migrations");
    let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();
    info!("Compiled migration versions: {:?}", versions);

    migrator.run(pool).await?;

    info!("Database migrations complete");
    Ok(())
}

/// Create the storage backend.
///
/// Uses PostgreSQL when `DATABASE_URL` is configured (running migrations
/// first), otherwise falls back to an in-memory store for local development.
pub async fn create_store(config: &Config) -> Result<Arc<dyn MasterDataStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config).await?;
            info!("Connected to PostgreSQL");

            run_migrations(&pool).await?;

            Ok(Arc::new(PgMasterDataStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store. Data will not survive a restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
