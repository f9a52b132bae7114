//! Wire types for the Cloud Storage JSON API and the Firestore REST API.
//!
//! Only the fields the backends read are declared; serde ignores the rest.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::BackendError;
use crate::job::{JobRecord, JobStatus};

/// Response of `GET /storage/v1/b/{bucket}/o`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    /// Absent when the listing is empty.
    #[serde(default)]
    pub items: Vec<StorageObject>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageObject {
    pub name: String,
}

/// Response of `GET /v1/projects/{p}/databases/(default)/documents/{collection}`.
///
/// An empty collection is returned as `{}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

/// A Firestore document: full resource name plus typed field values.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// A Firestore typed value. Only scalar kinds used by job records are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    pub string_value: Option<String>,
    /// Firestore encodes 64-bit integers as JSON strings.
    pub integer_value: Option<serde_json::Value>,
}

impl Value {
    /// The value rendered as text, or `None` for empty strings and other kinds.
    pub fn as_text(&self) -> Option<String> {
        if let Some(s) = self.string_value.as_deref().filter(|s| !s.is_empty()) {
            return Some(s.to_string());
        }
        match self.integer_value.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl Document {
    /// Last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|id| !id.is_empty())
    }

    pub fn field_text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(Value::as_text)
    }

    pub fn into_job_record(self) -> Result<JobRecord, BackendError> {
        let job_id = self
            .id()
            .ok_or_else(|| BackendError::Decode(format!("document without id: '{}'", self.name)))?
            .to_string();
        Ok(JobRecord {
            status: self.field_text("status").map(JobStatus::from),
            filename: self.field_text("filename"),
            job_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_list_deserialize_from_api_format() {
        let json = r#"{
            "kind": "storage#objects",
            "nextPageToken": "CgRh",
            "items": [
                {"kind": "storage#object", "name": "audiobooks/j1/a.wav", "size": "123"}
            ]
        }"#;
        let list: ObjectList = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].name, "audiobooks/j1/a.wav");
        assert_eq!(list.next_page_token.as_deref(), Some("CgRh"));
    }

    #[test]
    fn empty_listings_parse() {
        let objects: ObjectList = serde_json::from_str(r#"{"kind": "storage#objects"}"#).unwrap();
        assert!(objects.items.is_empty());
        let docs: DocumentList = serde_json::from_str("{}").unwrap();
        assert!(docs.documents.is_empty());
        assert!(docs.next_page_token.is_none());
    }

    #[test]
    fn document_to_job_record() {
        let json = r#"{
            "name": "projects/p/databases/(default)/documents/audiobook_jobs/j42",
            "fields": {
                "status": {"stringValue": "completed"},
                "filename": {"stringValue": "book.mp3"},
                "chunks": {"integerValue": "12"},
                "meta": {"mapValue": {"fields": {}}}
            },
            "createTime": "2025-12-26T16:48:42.000000Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.field_text("chunks").as_deref(), Some("12"));
        assert_eq!(doc.field_text("meta"), None);

        let record = doc.into_job_record().unwrap();
        assert_eq!(record.job_id, "j42");
        assert_eq!(record.status, Some(JobStatus::Completed));
        assert_eq!(record.filename.as_deref(), Some("book.mp3"));
    }

    #[test]
    fn document_without_fields() {
        let doc: Document =
            serde_json::from_str(r#"{"name": "projects/p/databases/(default)/documents/c/j1"}"#)
                .unwrap();
        let record = doc.into_job_record().unwrap();
        assert_eq!(record.status, None);
        assert_eq!(record.filename, None);
    }

    #[test]
    fn integer_status_is_kept_as_unknown() {
        let value: Value = serde_json::from_str(r#"{"integerValue": 3}"#).unwrap();
        assert_eq!(value.as_text().as_deref(), Some("3"));
        assert_eq!(
            JobStatus::from(value.as_text().unwrap()),
            JobStatus::Other("3".into())
        );
    }

    #[test]
    fn empty_string_reads_as_absent() {
        let value: Value = serde_json::from_str(r#"{"stringValue": ""}"#).unwrap();
        assert_eq!(value.as_text(), None);
    }

    #[test]
    fn document_with_blank_name_is_rejected() {
        let doc: Document = serde_json::from_str(r#"{"name": "c/"}"#).unwrap();
        assert!(matches!(doc.into_job_record(), Err(BackendError::Decode(_))));
    }
}
