//! CSV record reader
//!
//! Reads the header row, checks the required headers and yields one
//! [`ImportRecord`] per data row. Rows the reader cannot decode are logged and
//! skipped instead of failing the whole file.

use std::collections::HashMap;

use tracing::warn;

use super::error::ImportError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One data row keyed by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// 1-based line in the source file, the header being line 1
    pub line: u64,
    pub fields: HashMap<String, String>,
}

impl ImportRecord {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }
}

/// Lazy sequence of records, see [`parse_records`]
pub struct RecordStream<'a> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<&'a [u8]>,
}

impl Iterator for RecordStream<'_> {
    type Item = ImportRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    // Short rows leave the missing columns out, extra cells are ignored
                    let fields = self
                        .headers
                        .iter()
                        .zip(record.iter())
                        .map(|(header, value)| (header.clone(), value.to_string()))
                        .collect();

                    return Some(ImportRecord { line, fields });
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or_default();
                    warn!("Skipping malformed CSV row at line {}: {}", line, e);
                }
            }
        }
    }
}

/// Open `content` as CSV and verify that every required header is present.
///
/// Header names are compared exactly after trimming surrounding whitespace.
/// A leading UTF-8 byte order mark is ignored.
pub fn parse_records<'a>(
    content: &'a [u8],
    required_headers: &[&str],
) -> Result<RecordStream<'a>, ImportError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let missing: Vec<String> = required_headers
        .iter()
        .filter(|required| !headers.iter().any(|h| h.as_str() == **required))
        .map(|required| required.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ImportError::MissingHeaders(missing));
    }

    Ok(RecordStream {
        headers,
        records: reader.into_records(),
    })
}
