use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::audit::AuditEvent;
use crate::models::file_record::{FileRecord, FileSummary, NewFileRecord, RawFile};
use crate::models::upload_policy::UploadPolicy;
use crate::services::audit::AuditQueue;
use crate::services::record_store::{RecordStore, StoreError};
use crate::utils::payload::PayloadCodec;

/// Owns the loaded file list for one project at a time. Every mutation goes
/// through the store first and is followed by a reload, so the next list a
/// caller reads reflects it.
pub struct FileListManager {
    store: Arc<dyn RecordStore>,
    audit: AuditQueue,
    policy: UploadPolicy,
    codec: PayloadCodec,
    project_id: Option<Uuid>,
    files: Vec<FileSummary>,
}

impl FileListManager {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditQueue, policy: UploadPolicy) -> Self {
        let codec = PayloadCodec::new(policy.max_file_size);
        Self {
            store,
            audit,
            policy,
            codec,
            project_id: None,
            files: Vec::new(),
        }
    }

    pub fn project_id(&self) -> Option<Uuid> {
        self.project_id
    }

    pub fn files(&self) -> &[FileSummary] {
        &self.files
    }

    /// Replaces the list only on success; on failure the previous list stays.
    pub async fn load(&mut self, project_id: Uuid) -> Result<&[FileSummary], AppError> {
        match self.store.list_files(project_id).await {
            Ok(files) => {
                tracing::debug!(%project_id, count = files.len(), "Files | loaded");
                self.project_id = Some(project_id);
                self.files = files;
                Ok(&self.files)
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, kept = self.files.len(), "Files | load failed, keeping previous list");
                Err(AppError::FetchFailed(e.to_string()))
            }
        }
    }

    pub async fn upload(
        &mut self,
        project_id: Uuid,
        actor_id: Uuid,
        file: RawFile,
    ) -> Result<FileRecord, AppError> {
        if let Err(e) = self.policy.check(&file) {
            tracing::info!(%project_id, %actor_id, file = %file.file_name, error = %e, "Upload | rejected");
            return Err(e);
        }

        let RawFile {
            file_name,
            content_type,
            bytes,
            ..
        } = file;
        let file_size = bytes.len() as i64;

        let codec = self.codec;
        let media_type = content_type.clone();
        let payload = tokio::task::spawn_blocking(move || codec.encode(&bytes, &media_type))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Task join error: {}", e)))??;

        let record = self
            .store
            .insert_file(NewFileRecord {
                project_id,
                uploaded_by: actor_id,
                file_name: file_name.clone(),
                file_url: payload,
                file_size,
                file_type: content_type,
            })
            .await
            .map_err(|e| {
                tracing::error!(%project_id, file = %file_name, error = %e, "Upload | insert failed");
                AppError::UploadFailed(e.to_string())
            })?;

        self.audit
            .enqueue(AuditEvent::file_uploaded(project_id, actor_id, &file_name));

        tracing::info!(%project_id, file_id = %record.id, file = %record.file_name, size = record.file_size, "Upload | stored");

        if let Err(e) = self.load(project_id).await {
            tracing::warn!(%project_id, error = %e, "Upload | reload after upload failed");
        }

        Ok(record)
    }

    /// Only the uploader may delete. Deleting something already gone succeeds.
    pub async fn remove(&mut self, file_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        let record = self
            .store
            .get_file(file_id)
            .await
            .map_err(|e| AppError::FetchFailed(e.to_string()))?;

        let Some(record) = record else {
            tracing::info!(%file_id, %actor_id, "Delete | already absent");
            return Ok(());
        };

        if record.uploaded_by != actor_id {
            tracing::warn!(%file_id, %actor_id, owner = %record.uploaded_by, "Delete | refused, not the uploader");
            return Err(AppError::Unauthorized(
                "Only the uploader may delete this file".to_string(),
            ));
        }

        match self.store.delete_file(file_id).await {
            Ok(()) => tracing::info!(%file_id, %actor_id, "Delete | removed"),
            Err(StoreError::NotFound) => tracing::info!(%file_id, "Delete | already absent in store"),
            Err(e) => {
                tracing::error!(%file_id, error = %e, "Delete | store failed");
                return Err(AppError::InternalServerError(format!(
                    "Failed to delete file: {}",
                    e
                )));
            }
        }

        if let Err(e) = self.load(record.project_id).await {
            tracing::warn!(project_id = %record.project_id, error = %e, "Delete | reload after delete failed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::audit::{AuditRetry, AuditWorker};
    use crate::services::memory_store::MemoryStore;
    use crate::utils::classifier::{classify, FileCategory};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn open_policy(max: u64) -> UploadPolicy {
        UploadPolicy {
            max_file_size: max,
            allowed_extensions: ["txt", "png", "js"].iter().map(|s| s.to_string()).collect(),
            allowed_mime_types: ["text/plain", "image/png", "text/javascript"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn manager(store: &Arc<MemoryStore>, max: u64) -> (FileListManager, AuditWorker) {
        let (queue, worker) = AuditQueue::spawn(
            store.clone(),
            AuditRetry {
                max_attempts: 1,
                backoff: Duration::ZERO,
            },
        );
        (FileListManager::new(store.clone(), queue, open_policy(max)), worker)
    }

    fn seed(store: &MemoryStore, project_id: Uuid, owner: Uuid, name: &str) -> FileRecord {
        store.seed(NewFileRecord {
            project_id,
            uploaded_by: owner,
            file_name: name.to_string(),
            file_url: "data:text/plain;base64,aGk=".to_string(),
            file_size: 2,
            file_type: "text/plain".to_string(),
        })
    }

    #[tokio::test]
    async fn load_orders_newest_first_and_joins_uploader() {
        let store = Arc::new(MemoryStore::new());
        let (project, owner) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_profile(owner, "Ada Lovelace");
        let first = seed(&store, project, owner, "first.txt");
        let second = seed(&store, project, owner, "second.txt");
        seed(&store, Uuid::new_v4(), owner, "elsewhere.txt");
        let (mut files, _worker) = manager(&store, 100);

        let loaded = files.load(project).await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, second.id);
        assert_eq!(loaded[1].id, first.id);
        assert_eq!(loaded[0].uploader.as_ref().unwrap().full_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let store = Arc::new(MemoryStore::new());
        let (project, owner) = (Uuid::new_v4(), Uuid::new_v4());
        seed(&store, project, owner, "a.txt");
        let (mut files, _worker) = manager(&store, 100);
        files.load(project).await.unwrap();

        store.fail_list.store(true, Ordering::SeqCst);
        let err = files.load(project).await.unwrap_err();

        assert!(matches!(err, AppError::FetchFailed(_)));
        assert_eq!(files.files().len(), 1);
        assert_eq!(files.files()[0].file_name, "a.txt");
        assert_eq!(files.project_id(), Some(project));
    }

    #[tokio::test]
    async fn upload_stores_record_audits_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let (project, actor) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut files, worker) = manager(&store, 100);

        let record = files
            .upload(project, actor, RawFile::new("a.txt", "text/plain", b"hi".to_vec()))
            .await
            .unwrap();

        assert_eq!(record.file_size, 2);
        assert_eq!(record.uploaded_by, actor);
        assert_eq!(record.file_url, "data:text/plain;base64,aGk=");
        assert_eq!(classify(&record.file_name), FileCategory::RenderableText);
        assert_eq!(files.files().len(), 1);
        assert_eq!(files.files()[0].id, record.id);

        drop(files);
        worker.join().await;
        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "file");
        assert_eq!(events[0].event_action, "uploaded");
        assert_eq!(events[0].event_data["file_name"], "a.txt");
        assert_eq!(events[0].user_id, actor);
    }

    #[tokio::test]
    async fn oversized_upload_never_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let (mut files, _worker) = manager(&store, 4);
        let mut file = RawFile::new("big.txt", "text/plain", b"tiny".to_vec());
        file.declared_size = 5;

        let err = files
            .upload(Uuid::new_v4(), Uuid::new_v4(), file)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge { size: 5, limit: 4 }));
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disallowed_type_never_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let (mut files, _worker) = manager(&store, 100);

        let err = files
            .upload(
                Uuid::new_v4(),
                Uuid::new_v4(),
                RawFile::new("run.exe", "application/x-msdownload", b"MZ".to_vec()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFileType(_)));
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_failure_is_upload_failed_and_not_audited() {
        let store = Arc::new(MemoryStore::new());
        store.fail_insert.store(true, Ordering::SeqCst);
        let (mut files, worker) = manager(&store, 100);

        let err = files
            .upload(
                Uuid::new_v4(),
                Uuid::new_v4(),
                RawFile::new("a.txt", "text/plain", b"hi".to_vec()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UploadFailed(_)));
        drop(files);
        worker.join().await;
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_upload() {
        let store = Arc::new(MemoryStore::new());
        store.audit_failures.store(5, Ordering::SeqCst);
        let (mut files, worker) = manager(&store, 100);
        let stats = files.audit.stats();

        let result = files
            .upload(
                Uuid::new_v4(),
                Uuid::new_v4(),
                RawFile::new("a.txt", "text/plain", b"hi".to_vec()),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(store.file_count(), 1);
        drop(files);
        worker.join().await;
        assert_eq!(stats.failed(), 1);
    }

    #[tokio::test]
    async fn upload_succeeds_even_if_reload_fails() {
        let store = Arc::new(MemoryStore::new());
        let project = Uuid::new_v4();
        seed(&store, project, Uuid::new_v4(), "old.txt");
        let (mut files, _worker) = manager(&store, 100);
        files.load(project).await.unwrap();
        store.fail_list.store(true, Ordering::SeqCst);

        let record = files
            .upload(project, Uuid::new_v4(), RawFile::new("a.txt", "text/plain", b"hi".to_vec()))
            .await;

        assert!(record.is_ok());
        assert_eq!(files.files().len(), 1);
        assert_eq!(files.files()[0].file_name, "old.txt");
    }

    #[tokio::test]
    async fn remove_by_non_owner_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        let (project, owner, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let record = seed(&store, project, owner, "a.txt");
        let (mut files, _worker) = manager(&store, 100);

        let err = files.remove(record.id, other).await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.file_count(), 1);
    }

    #[tokio::test]
    async fn remove_by_owner_deletes_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let (project, owner) = (Uuid::new_v4(), Uuid::new_v4());
        let record = seed(&store, project, owner, "a.txt");
        seed(&store, project, owner, "b.txt");
        let (mut files, _worker) = manager(&store, 100);
        files.load(project).await.unwrap();

        files.remove(record.id, owner).await.unwrap();

        assert_eq!(store.file_count(), 1);
        assert_eq!(files.files().len(), 1);
        assert_eq!(files.files()[0].file_name, "b.txt");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let (mut files, _worker) = manager(&store, 100);

        assert!(files.remove(Uuid::new_v4(), Uuid::new_v4()).await.is_ok());
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remove_surfaces_store_failure() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let record = seed(&store, Uuid::new_v4(), owner, "a.txt");
        store.fail_delete.store(true, Ordering::SeqCst);
        let (mut files, _worker) = manager(&store, 100);

        assert!(files.remove(record.id, owner).await.is_err());
        assert_eq!(store.file_count(), 1);
    }
}
