//! Bulk replace of master data tables from CSV uploads
//!
//! One upload moves through
//! `Received -> Parsed -> Normalized -> Validated -> Committing -> Committed`.
//! Every rejection before `Committing` leaves storage untouched, and a failed
//! commit is rolled back by the store.

pub mod csv_reader;
pub mod error;
pub mod normalize;
pub mod validate;

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::db::MasterDataStore;
use crate::types::{DeleteAllResponse, EntityRow, TableSpec, UploadCsvResponse};

pub use csv_reader::parse_records;
pub use error::ImportError;
pub use normalize::normalize;
pub use validate::validate;

/// Reject anything that is not a non-empty `.csv` file
pub fn check_upload(filename: &str, content: &[u8]) -> Result<(), ImportError> {
    let is_csv = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if !is_csv {
        return Err(ImportError::InvalidFileType);
    }
    if content.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    Ok(())
}

/// Parse, normalize and validate an upload without touching storage
pub fn prepare_batch(table: &TableSpec, content: &[u8]) -> Result<Vec<EntityRow>, ImportError> {
    let records = parse_records(content, &table.required_headers())?;

    let mut skipped = 0;
    let rows: Vec<EntityRow> = records
        .filter_map(|record| {
            let row = normalize(&record, table.columns);
            if row.is_none() {
                debug!("Dropping line {} of {} upload: required value missing", record.line, table.entity);
                skipped += 1;
            }
            row
        })
        .collect();

    debug!("Normalized {} {} ({} dropped)", rows.len(), table.entity_plural, skipped);

    if rows.is_empty() {
        return Err(ImportError::EmptyBatch);
    }

    let issues = validate(&rows, table);
    if !issues.is_empty() {
        warn!("Rejected {} upload with {} validation issue(s)", table.entity, issues.len());
        return Err(ImportError::ValidationFailed(issues));
    }

    Ok(rows)
}

/// Replace the whole table with the rows of an uploaded CSV file
pub async fn import_csv(
    store: &dyn MasterDataStore,
    table: &'static TableSpec,
    filename: &str,
    content: &[u8],
) -> Result<UploadCsvResponse, ImportError> {
    check_upload(filename, content)?;
    debug!("Received {} ({} bytes) for {}", filename, content.len(), table.table);

    let rows = prepare_batch(table, content)?;

    info!("Replacing {} with {} rows from {}", table.table, rows.len(), filename);
    let outcome = store.replace_all(table, &rows).await.map_err(|e| {
        error!("Replace of {} rolled back: {}", table.table, e);
        e
    })?;

    info!(
        "Committed {}: {} imported, {} replaced, {} vessel references cleared",
        table.table, outcome.imported, outcome.replaced, outcome.references_cleared
    );

    Ok(UploadCsvResponse {
        imported_count: outcome.imported,
        replaced_count: outcome.replaced,
        references_cleared: outcome.references_cleared,
        message: format!("Successfully uploaded {} {}.", outcome.imported, table.entity_plural),
    })
}

/// Empty the whole table, clearing every vessel reference to it
pub async fn delete_table(
    store: &dyn MasterDataStore,
    table: &'static TableSpec,
) -> Result<DeleteAllResponse, ImportError> {
    let outcome = store.delete_all(table).await.map_err(|e| {
        error!("Delete of {} rolled back: {}", table.table, e);
        e
    })?;

    let message = if outcome.deleted == 0 {
        format!("No {} to delete.", table.entity_plural)
    } else {
        info!(
            "Deleted {} rows of {}, cleared {} vessel references",
            outcome.deleted, table.table, outcome.references_cleared
        );
        format!(
            "Successfully deleted {} {} and cleared references from {} vessel(s).",
            outcome.deleted, table.entity_plural, outcome.references_cleared
        )
    };

    Ok(DeleteAllResponse {
        deleted_count: outcome.deleted,
        references_cleared: outcome.references_cleared,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::VesselRecord;
    use crate::db::{MemoryStore, StoreError};
    use crate::types::{CHARTERERS, SHIPPING_LINES, TRANSPORT_SEAS};

    fn vessel_with_line(code: &str, line: &str) -> VesselRecord {
        let mut vessel = VesselRecord::new(code, "Test Vessel");
        vessel.shipping_line_code = Some(line.to_string());
        vessel
    }

    async fn keys(store: &MemoryStore, table: &'static TableSpec) -> Vec<String> {
        store
            .list(table)
            .await
            .unwrap()
            .iter()
            .map(|r| r.key().to_string())
            .collect()
    }

    #[test]
    fn test_check_upload() {
        assert!(check_upload("lines.csv", b"x").is_ok());
        assert!(check_upload("LINES.CSV", b"x").is_ok());
        assert!(matches!(check_upload("lines.xlsx", b"x"), Err(ImportError::InvalidFileType)));
        assert!(matches!(check_upload("csv", b"x"), Err(ImportError::InvalidFileType)));
        assert!(matches!(check_upload("lines.csv", b""), Err(ImportError::EmptyFile)));
    }

    #[tokio::test]
    async fn test_trimmed_rows_are_committed() {
        let store = MemoryStore::new();
        let csv = b"Code,Description\nMAEU,Maersk Line\nMSC ,  Mediterranean Shipping Company \n";

        let response = import_csv(&store, &SHIPPING_LINES, "lines.csv", csv).await.unwrap();

        assert_eq!(response.imported_count, 2);
        assert_eq!(response.message, "Successfully uploaded 2 shipping lines.");
        let rows = store.list(&SHIPPING_LINES).await.unwrap();
        assert_eq!(rows[0].values, vec![Some("MAEU".to_string()), Some("Maersk Line".to_string())]);
        assert_eq!(
            rows[1].values,
            vec![Some("MSC".to_string()), Some("Mediterranean Shipping Company".to_string())]
        );
    }

    #[tokio::test]
    async fn test_duplicate_keys_never_reach_storage() {
        let store = MemoryStore::new();
        import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nOLD,Old Line\n")
            .await
            .unwrap();

        let result = import_csv(
            &store,
            &SHIPPING_LINES,
            "lines.csv",
            b"Code,Description\nAB,Line A\nAB,Line B\n",
        )
        .await;

        match result {
            Err(ImportError::ValidationFailed(issues)) => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].0.contains("AB"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(keys(&store, &SHIPPING_LINES).await, vec!["OLD"]);
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let store = MemoryStore::new();
        let csv = b"Key Code,Description,Long Description\nACME,Acme,Acme Chartering Ltd\nBLT,Baltic,\n";

        import_csv(&store, &CHARTERERS, "charterers.csv", csv).await.unwrap();
        let first = store.list(&CHARTERERS).await.unwrap();
        let response = import_csv(&store, &CHARTERERS, "charterers.csv", csv).await.unwrap();

        assert_eq!(response.replaced_count, 2);
        assert_eq!(store.list(&CHARTERERS).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_over_long_key_is_truncated() {
        let store = MemoryStore::new();
        let csv = b"TransportID,Name,CarrierCode,CarrierName\n9HA1234567890,Ever Given,EGL,Evergreen\n";

        import_csv(&store, &TRANSPORT_SEAS, "callsigns.csv", csv).await.unwrap();

        assert_eq!(keys(&store, &TRANSPORT_SEAS).await, vec!["9HA1234567"]);
    }

    #[tokio::test]
    async fn test_rows_without_key_are_dropped() {
        let store = MemoryStore::new();
        let csv = b"Code,Description\n,Orphan\nMAEU,Maersk Line\n";

        let response = import_csv(&store, &SHIPPING_LINES, "lines.csv", csv).await.unwrap();

        assert_eq!(response.imported_count, 1);
    }

    #[tokio::test]
    async fn test_only_invalid_rows_is_empty_batch() {
        let store = MemoryStore::new();
        let result = import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\n,Orphan\n").await;
        assert!(matches!(result, Err(ImportError::EmptyBatch)));
    }

    #[tokio::test]
    async fn test_missing_headers_rejected() {
        let store = MemoryStore::new();
        let result = import_csv(&store, &TRANSPORT_SEAS, "callsigns.csv", b"TransportID,Name\nX,Y\n").await;

        match result {
            Err(ImportError::MissingHeaders(missing)) => assert_eq!(missing, vec!["CarrierCode", "CarrierName"]),
            other => panic!("expected missing headers, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replace_reports_cleared_references() {
        let store = MemoryStore::with_vessels(vec![vessel_with_line("V001", "CMDU")]);
        import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nCMDU,CMA CGM\n")
            .await
            .unwrap();

        let response = import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nMAEU,Maersk\n")
            .await
            .unwrap();

        assert_eq!(response.references_cleared, 1);
        assert!(store.vessels()[0].shipping_line_code.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_previous_contents() {
        let store = MemoryStore::with_vessels(vec![vessel_with_line("V001", "MAEU")]);
        import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nMAEU,Maersk Line\n")
            .await
            .unwrap();

        store.fail_next_insert(StoreError::Timeout("canceling statement due to statement timeout".to_string()));
        let result = import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nMSC,MSC\n").await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert_eq!(keys(&store, &SHIPPING_LINES).await, vec!["MAEU"]);
        assert_eq!(store.vessels()[0].shipping_line_code.as_deref(), Some("MAEU"));
    }

    #[tokio::test]
    async fn test_delete_table_clears_vessel_reference() {
        let store = MemoryStore::with_vessels(vec![
            vessel_with_line("V001", "MAEU"),
            vessel_with_line("V002", "ONEY"),
        ]);
        import_csv(&store, &SHIPPING_LINES, "lines.csv", b"Code,Description\nMAEU,Maersk Line\n")
            .await
            .unwrap();

        let response = delete_table(&store, &SHIPPING_LINES).await.unwrap();

        assert_eq!(response.deleted_count, 1);
        assert_eq!(response.references_cleared, 1);
        assert_eq!(
            response.message,
            "Successfully deleted 1 shipping lines and cleared references from 1 vessel(s)."
        );
        let vessels = store.vessels();
        assert!(vessels[0].shipping_line_code.is_none());
        assert_eq!(vessels[1].shipping_line_code.as_deref(), Some("ONEY"));
    }

    #[tokio::test]
    async fn test_delete_empty_table() {
        let store = MemoryStore::new();
        let response = delete_table(&store, &CHARTERERS).await.unwrap();

        assert_eq!(response.deleted_count, 0);
        assert_eq!(response.message, "No charterers to delete.");
    }
}
