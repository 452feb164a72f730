//! In-memory master data store
//!
//! Used for local development without PostgreSQL and in tests. Every
//! mutation runs against a copy of the tables which only replaces the live
//! state once all steps succeeded, mirroring transaction semantics.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{ConstraintKind, DeleteOutcome, MasterDataStore, ReplaceOutcome, StoreError};
use crate::types::{EntityRow, TableSpec, VesselReference};

/// Vessel master row, reduced to the columns that reference master data
#[derive(Debug, Clone, PartialEq)]
pub struct VesselRecord {
    pub vessel_code: String,
    pub vessel_name: String,
    pub shipping_line_code: Option<String>,
    pub charterer: Option<String>,
    pub call_sign: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl VesselRecord {
    pub fn new(vessel_code: &str, vessel_name: &str) -> Self {
        Self {
            vessel_code: vessel_code.to_string(),
            vessel_name: vessel_name.to_string(),
            shipping_line_code: None,
            charterer: None,
            call_sign: None,
            modified_at: None,
        }
    }

    pub fn reference(&self, reference: VesselReference) -> Option<&str> {
        match reference {
            VesselReference::ShippingLine => self.shipping_line_code.as_deref(),
            VesselReference::Charterer => self.charterer.as_deref(),
            VesselReference::CallSign => self.call_sign.as_deref(),
        }
    }

    fn reference_mut(&mut self, reference: VesselReference) -> &mut Option<String> {
        match reference {
            VesselReference::ShippingLine => &mut self.shipping_line_code,
            VesselReference::Charterer => &mut self.charterer,
            VesselReference::CallSign => &mut self.call_sign,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<&'static str, Vec<EntityRow>>,
    vessels: Vec<VesselRecord>,
}

impl Tables {
    fn clear_references(&mut self, reference: VesselReference, keys: &HashSet<String>) -> u64 {
        let now = Utc::now();
        let mut cleared = 0;

        for vessel in &mut self.vessels {
            let matches = vessel
                .reference(reference)
                .is_some_and(|value| keys.contains(value));

            if matches {
                *vessel.reference_mut(reference) = None;
                vessel.modified_at = Some(now);
                cleared += 1;
            }
        }

        cleared
    }

    fn insert(&mut self, table: &TableSpec, rows: &[EntityRow]) -> Result<u64, StoreError> {
        let stored = self.rows.entry(table.table).or_default();
        let mut keys: HashSet<String> = stored.iter().map(|r| r.key().to_string()).collect();

        for row in rows {
            for (column, value) in table.columns.iter().zip(&row.values) {
                if value.as_deref().is_some_and(|v| v.chars().count() > column.max_length) {
                    return Err(StoreError::ConstraintViolation(
                        ConstraintKind::ValueTooLong,
                        format!("value too long for column {}", column.column),
                    ));
                }
            }

            if !keys.insert(row.key().to_string()) {
                return Err(StoreError::ConstraintViolation(
                    ConstraintKind::DuplicateKey,
                    format!("duplicate key value violates unique constraint \"{}_pkey\"", table.table),
                ));
            }

            stored.push(row.clone());
        }

        Ok(rows.len() as u64)
    }
}

pub struct MemoryStore {
    state: Mutex<Tables>,
    /// Error returned by the next insert, consumed when raised
    insert_fault: Mutex<Option<StoreError>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Tables::default()),
            insert_fault: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_vessels(vessels: Vec<VesselRecord>) -> Self {
        let store = Self::new();
        store.state.lock().vessels = vessels;
        store
    }

    #[cfg(test)]
    pub fn vessels(&self) -> Vec<VesselRecord> {
        self.state.lock().vessels.clone()
    }

    /// Make the next insert fail with `err`
    #[cfg(test)]
    pub fn fail_next_insert(&self, err: StoreError) {
        *self.insert_fault.lock() = Some(err);
    }
}

#[async_trait]
impl MasterDataStore for MemoryStore {
    async fn list(&self, table: &'static TableSpec) -> Result<Vec<EntityRow>, StoreError> {
        let mut rows = self
            .state
            .lock()
            .rows
            .get(table.table)
            .cloned()
            .unwrap_or_default();

        // NULLs last, like an ascending ORDER BY in Postgres
        rows.sort_by(|a, b| {
            let a_value = a.value(table.order_by);
            let b_value = b.value(table.order_by);
            (a_value.is_none(), a_value, a.key()).cmp(&(b_value.is_none(), b_value, b.key()))
        });

        Ok(rows)
    }

    async fn replace_all(
        &self,
        table: &'static TableSpec,
        rows: &[EntityRow],
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut state = self.state.lock();
        let mut working = state.clone();

        let existing = working.rows.remove(table.table).unwrap_or_default();
        let incoming: HashSet<&str> = rows.iter().map(|r| r.key()).collect();
        let removed_keys: HashSet<String> = existing
            .iter()
            .map(|r| r.key())
            .filter(|key| !incoming.contains(key))
            .map(str::to_string)
            .collect();

        let references_cleared = match table.referenced_by {
            Some(reference) => working.clear_references(reference, &removed_keys),
            None => 0,
        };

        if let Some(err) = self.insert_fault.lock().take() {
            return Err(err);
        }
        let imported = working.insert(table, rows)?;

        *state = working;

        Ok(ReplaceOutcome {
            imported,
            replaced: existing.len() as u64,
            references_cleared,
        })
    }

    async fn delete_all(&self, table: &'static TableSpec) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.state.lock();
        let mut working = state.clone();

        let existing = working.rows.remove(table.table).unwrap_or_default();
        let keys: HashSet<String> = existing.iter().map(|r| r.key().to_string()).collect();

        let references_cleared = match table.referenced_by {
            Some(reference) => working.clear_references(reference, &keys),
            None => 0,
        };

        *state = working;

        Ok(DeleteOutcome {
            deleted: existing.len() as u64,
            references_cleared,
        })
    }

    fn name(&self) -> &str {
        "InMemory"
    }
}
