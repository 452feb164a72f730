//! PostgreSQL master data store

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error};

use super::queries;
use super::{DeleteOutcome, MasterDataStore, ReplaceOutcome, StoreError};
use crate::types::{EntityRow, TableSpec};

pub struct PgMasterDataStore {
    pool: PgPool,
}

impl PgMasterDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MasterDataStore for PgMasterDataStore {
    async fn list(&self, table: &'static TableSpec) -> Result<Vec<EntityRow>, StoreError> {
        Ok(queries::master_data::list_rows(&self.pool, table).await?)
    }

    async fn replace_all(
        &self,
        table: &'static TableSpec,
        rows: &[EntityRow],
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        match apply_replace(&mut tx, table, rows).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Failed to roll back replace of {}: {}", table.table, rollback_err);
                }
                Err(e.into())
            }
        }
    }

    async fn delete_all(&self, table: &'static TableSpec) -> Result<DeleteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        match apply_delete(&mut tx, table).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Failed to roll back delete of {}: {}", table.table, rollback_err);
                }
                Err(e.into())
            }
        }
    }

    fn name(&self) -> &str {
        "PostgreSQL"
    }
}

async fn apply_replace(
    conn: &mut PgConnection,
    table: &TableSpec,
    rows: &[EntityRow],
) -> Result<ReplaceOutcome, sqlx::Error> {
    let existing = queries::master_data::existing_keys(&mut *conn, table).await?;

    // Keys that survive the replace keep their vessel references
    let incoming: HashSet<&str> = rows.iter().map(|r| r.key()).collect();
    let removed_keys: Vec<String> = existing
        .into_iter()
        .filter(|key| !incoming.contains(key.as_str()))
        .collect();

    let references_cleared = match table.referenced_by {
        Some(reference) => {
            queries::vessel::clear_references(&mut *conn, reference, &removed_keys).await?
        }
        None => 0,
    };

    let replaced = queries::master_data::delete_rows(&mut *conn, table).await?;
    let imported = queries::master_data::insert_rows(&mut *conn, table, rows).await?;

    debug!(
        "Replaced {} rows of {} with {}, cleared {} vessel references",
        replaced, table.table, imported, references_cleared
    );

    Ok(ReplaceOutcome {
        imported,
        replaced,
        references_cleared,
    })
}

async fn apply_delete(conn: &mut PgConnection, table: &TableSpec) -> Result<DeleteOutcome, sqlx::Error> {
    let keys = queries::master_data::existing_keys(&mut *conn, table).await?;

    let references_cleared = match table.referenced_by {
        Some(reference) => queries::vessel::clear_references(&mut *conn, reference, &keys).await?,
        None => 0,
    };

    let deleted = queries::master_data::delete_rows(&mut *conn, table).await?;

    Ok(DeleteOutcome {
        deleted,
        references_cleared,
    })
}
