//! CSV upload and bulk replace types

use serde::{Deserialize, Serialize};

/// Uploaded CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCsvRequest {
    pub filename: String,
    /// File content, base64 encoded
    pub content: String,
}

/// Result of a committed bulk replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCsvResponse {
    pub imported_count: u64,
    /// Rows that were in the table before the replace
    pub replaced_count: u64,
    pub references_cleared: u64,
    pub message: String,
}

/// Result of deleting a whole master data table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub deleted_count: u64,
    pub references_cleared: u64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_deserialize() {
        let json = r#"{"filename": "lines.CSV", "content": "Q29kZSxEZXNjcmlwdGlvbgo="}"#;
        let request: UploadCsvRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.filename, "lines.CSV");
    }

    #[test]
    fn test_upload_response_serializes_camel_case() {
        let response = UploadCsvResponse {
            imported_count: 2,
            replaced_count: 4,
            references_cleared: 1,
            message: "Successfully uploaded 2 shipping lines.".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"importedCount\":2"));
        assert!(json.contains("\"replacedCount\":4"));
        assert!(json.contains("\"referencesCleared\":1"));
    }
}
