//! In-memory `RecordStore` for tests, with failure injection and call counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::audit::AuditEvent;
use crate::models::file_record::{FileRecord, FileSummary, NewFileRecord, UploaderProfile};
use crate::services::record_store::{RecordStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<Vec<FileRecord>>,
    events: Mutex<HashMap<Uuid, AuditEvent>>,
    profiles: Mutex<HashMap<Uuid, UploaderProfile>>,
    seq: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Number of upcoming audit writes that fail before one succeeds.
    pub audit_failures: AtomicU32,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub audit_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, id: Uuid, full_name: &str) {
        self.profiles.lock().unwrap().insert(
            id,
            UploaderProfile {
                id,
                full_name: full_name.to_string(),
            },
        );
    }

    /// Seed a record directly, bypassing the upload path.
    pub fn seed(&self, record: NewFileRecord) -> FileRecord {
        let stored = self.build(record);
        self.files.lock().unwrap().push(stored.clone());
        stored
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().values().cloned().collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn build(&self, record: NewFileRecord) -> FileRecord {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        let created_at = NaiveDateTime::default() + chrono::Duration::seconds(n);
        FileRecord {
            id: Uuid::new_v4(),
            project_id: record.project_id,
            uploaded_by: record.uploaded_by,
            file_name: record.file_name,
            file_url: record.file_url,
            file_size: record.file_size,
            file_type: record.file_type,
            created_at,
            uploader: None,
        }
    }

    fn with_uploader(&self, mut record: FileRecord) -> FileRecord {
        record.uploader = self.profiles.lock().unwrap().get(&record.uploaded_by).cloned();
        record
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_files(&self, project_id: Uuid) -> Result<Vec<FileSummary>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list failed".to_string()));
        }
        let mut files: Vec<FileRecord> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files
            .into_iter()
            .map(|f| FileSummary::from(self.with_uploader(f)))
            .collect())
    }

    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        let found = self.files.lock().unwrap().iter().find(|f| f.id == id).cloned();
        Ok(found.map(|f| self.with_uploader(f)))
    }

    async fn insert_file(&self, record: NewFileRecord) -> Result<FileRecord, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("insert failed".to_string()));
        }
        Ok(self.seed(record))
    }

    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.audit_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.audit_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.audit_failures.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("audit insert failed".to_string()));
        }
        self.events
            .lock()
            .unwrap()
            .entry(event.id)
            .or_insert_with(|| event.clone());
        Ok(())
    }

    async fn delete_file(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("delete failed".to_string()));
        }
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f.id != id);
        if files.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
