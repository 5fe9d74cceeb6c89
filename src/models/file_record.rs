use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{file, profile};

/// Display data for the identity that uploaded a file, joined at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploaderProfile {
    pub id: Uuid,
    pub full_name: String,
}

impl From<profile::Model> for UploaderProfile {
    fn from(model: profile::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
        }
    }
}

/// One uploaded artifact. Immutable once stored; only deletion changes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub uploaded_by: Uuid,
    /// Client supplied, untrusted.
    pub file_name: String,
    /// Stored payload: an inline data URI or a reference URL.
    pub file_url: String,
    pub file_size: i64,
    /// Client supplied, untrusted.
    pub file_type: String,
    pub created_at: NaiveDateTime,
    pub uploader: Option<UploaderProfile>,
}

impl FileRecord {
    pub fn from_parts(model: file::Model, uploader: Option<profile::Model>) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            uploaded_by: model.uploaded_by,
            file_name: model.file_name,
            file_url: model.file_url,
            file_size: model.file_size,
            file_type: model.file_type,
            created_at: model.created_at,
            uploader: uploader.map(UploaderProfile::from),
        }
    }
}

/// A list entry: everything in `FileRecord` except the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub created_at: NaiveDateTime,
    pub uploader: Option<UploaderProfile>,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            uploaded_by: record.uploaded_by,
            file_name: record.file_name,
            file_size: record.file_size,
            file_type: record.file_type,
            created_at: record.created_at,
            uploader: record.uploader,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFileRecord {
    pub project_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
}

/// A file as received from the client, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub file_name: String,
    pub content_type: String,
    pub declared_size: u64,
    pub bytes: Vec<u8>,
}

impl RawFile {
    /// Declared size taken from the received bytes.
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            declared_size: bytes.len() as u64,
            bytes,
        }
    }
}
