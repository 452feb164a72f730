//! Storage error classification

use thiserror::Error;

use crate::types::TableSpec;

/// Constraint the storage layer rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    DuplicateKey,
    ValueTooLong,
    ForeignKey,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("constraint violation: {1}")]
    ConstraintViolation(ConstraintKind, String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

/// Postgres SQLSTATE for string_data_right_truncation
const PG_VALUE_TOO_LONG: &str = "22001";
/// Postgres SQLSTATE for query_canceled (statement_timeout)
const PG_QUERY_CANCELED: &str = "57014";
/// Postgres SQLSTATE for lock_not_available (lock_timeout)
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout(err.to_string()),
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                StoreError::Timeout(err.to_string())
            }
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();

                if db.is_unique_violation() {
                    StoreError::ConstraintViolation(ConstraintKind::DuplicateKey, message)
                } else if db.is_foreign_key_violation() {
                    StoreError::ConstraintViolation(ConstraintKind::ForeignKey, message)
                } else if code == PG_VALUE_TOO_LONG {
                    StoreError::ConstraintViolation(ConstraintKind::ValueTooLong, message)
                } else if code == PG_QUERY_CANCELED || code == PG_LOCK_NOT_AVAILABLE {
                    StoreError::Timeout(message)
                } else {
                    StoreError::Other(message)
                }
            }
            _ => StoreError::Other(err.to_string()),
        }
    }
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::ConstraintViolation(..) => "CONSTRAINT_VIOLATION",
            StoreError::Timeout(_) => "TIMEOUT",
            StoreError::Other(_) => "DATABASE_ERROR",
        }
    }

    /// Message shown to the operator for a failure on `table`
    pub fn user_message(&self, table: &TableSpec) -> String {
        let key = table.key().label;
        match self {
            StoreError::ConstraintViolation(ConstraintKind::DuplicateKey, _) => format!(
                "Duplicate {} {}s found. Please ensure all {}s are unique.",
                table.entity, key, key
            ),
            StoreError::ConstraintViolation(ConstraintKind::ValueTooLong, _) => {
                let limits: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| format!("{}s should be {} characters or less", capitalize(c.label), c.max_length))
                    .collect();
                format!("Some data is too long for database fields. {}.", limits.join(", "))
            }
            StoreError::ConstraintViolation(ConstraintKind::ForeignKey, message) => format!(
                "Some {} are still referenced by other records: {}",
                table.entity_plural, message
            ),
            StoreError::Timeout(_) => "Database operation timed out. Please try again.".to_string(),
            StoreError::Other(message) => message.clone(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
