//! Row normalization
//!
//! Over-long values are truncated, never rejected. A row is only dropped when
//! a required column is empty after trimming.

use once_cell::sync::Lazy;
use regex::Regex;

use super::csv_reader::ImportRecord;
use crate::types::{ColumnSpec, EntityRow};

/// Anything that is not a letter, digit, punctuation, symbol or white space
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{Nd}\p{P}\p{S}\s.,\-_&/]").expect("valid allow-list pattern")
});

/// Remove characters outside the allow-list (control and format characters)
pub fn filter_chars(value: &str) -> String {
    DISALLOWED_CHARS.replace_all(value, "").into_owned()
}

/// Prefix of at most `max_length` characters
pub fn truncate_chars(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Normalize one record against the table columns.
///
/// Returns `None` when a required column is missing or blank.
pub fn normalize(record: &ImportRecord, columns: &[ColumnSpec]) -> Option<EntityRow> {
    let mut values = Vec::with_capacity(columns.len());

    for column in columns {
        let trimmed = record.get(column.header).unwrap_or_default().trim();

        if trimmed.is_empty() {
            if column.required {
                return None;
            }
            values.push(None);
            continue;
        }

        let filtered = filter_chars(trimmed);
        let value = truncate_chars(filtered.trim(), column.max_length);

        values.push((!value.is_empty()).then_some(value));
    }

    Some(EntityRow::new(values))
}
