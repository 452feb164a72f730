//! Import error kinds and their operator messages

use thiserror::Error;

use super::validate::ValidationIssue;
use crate::db::StoreError;
use crate::types::TableSpec;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Please upload a CSV file.")]
    InvalidFileType,
    #[error("Please select a CSV file.")]
    EmptyFile,
    #[error("CSV file is missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    #[error("Error processing CSV file: {0}")]
    Csv(String),
    #[error("no valid rows in file")]
    EmptyBatch,
    #[error("validation failed with {} issue(s)", .0.len())]
    ValidationFailed(Vec<ValidationIssue>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Response error code
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InvalidFileType => "INVALID_FILE_TYPE",
            ImportError::EmptyFile => "EMPTY_FILE",
            ImportError::MissingHeaders(_) => "MISSING_HEADERS",
            ImportError::Csv(_) => "CSV_ERROR",
            ImportError::EmptyBatch => "EMPTY_BATCH",
            ImportError::ValidationFailed(_) => "VALIDATION_FAILED",
            ImportError::Store(e) => e.code(),
        }
    }

    /// Every message to show the operator for a failure on `table`
    pub fn messages(&self, table: &TableSpec) -> Vec<String> {
        match self {
            ImportError::EmptyBatch => {
                vec![format!("No valid {} found in the CSV file.", table.entity_plural)]
            }
            ImportError::ValidationFailed(issues) => issues.iter().map(ToString::to_string).collect(),
            ImportError::Store(e) => vec![format!("Database error: {}", e.user_message(table))],
            other => vec![other.to_string()],
        }
    }
}
