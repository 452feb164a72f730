//! Batch validation
//!
//! All checks run over the whole batch; a non-empty result rejects it.

use std::collections::HashMap;
use std::fmt;

use crate::types::{EntityRow, TableSpec};

/// One batch level problem, phrased for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue(pub String);

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub fn validate(rows: &[EntityRow], table: &TableSpec) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let key_label = table.key().label;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen = Vec::new();
    for row in rows.iter().filter(|r| !is_blank(Some(r.key()))) {
        let count = counts.entry(row.key()).or_default();
        if *count == 0 {
            first_seen.push(row.key());
        }
        *count += 1;
    }

    let duplicates: Vec<&str> = first_seen.into_iter().filter(|key| counts[key] > 1).collect();
    if !duplicates.is_empty() {
        issues.push(ValidationIssue(format!(
            "Duplicate {}s found: {}",
            key_label,
            duplicates.join(", ")
        )));
    }

    let empty_keys = rows.iter().filter(|r| is_blank(Some(r.key()))).count();
    if empty_keys > 0 {
        issues.push(ValidationIssue(format!(
            "Found {} records with empty {}s",
            empty_keys, key_label
        )));
    }

    if let Some(idx) = table.description_column {
        let empty = rows.iter().filter(|r| is_blank(r.value(idx))).count();
        if empty > 0 {
            issues.push(ValidationIssue(format!(
                "Found {} records with empty {}s",
                empty, table.columns[idx].label
            )));
        }
    }

    issues
}
