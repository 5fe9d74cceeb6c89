use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::upload_policy::UploadPolicy;
use crate::services::audit::AuditQueue;
use crate::services::file_list::FileListManager;
use crate::services::record_store::RecordStore;
use crate::utils::payload::PayloadCodec;

pub const DEFAULT_FILE_LIST_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub audit: AuditQueue,
    pub policy: UploadPolicy,
    pub jwt_secret: Arc<str>,
    pub lists: FileLists,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: AuditQueue,
        policy: UploadPolicy,
        jwt_secret: &str,
    ) -> Self {
        Self {
            store,
            audit,
            policy,
            jwt_secret: Arc::from(jwt_secret),
            lists: FileLists::new(DEFAULT_FILE_LIST_CAPACITY),
        }
    }

    /// Cap on how many project lists are kept loaded at once.
    pub fn with_list_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.lists = FileLists::new(capacity);
        self
    }

    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::new(self.policy.max_file_size)
    }

    /// The list manager that owns `project_id`'s file list, created on first use.
    pub async fn file_list(&self, project_id: Uuid) -> Arc<Mutex<FileListManager>> {
        let mut lists = self.lists.0.lock().await;
        if let Some(existing) = lists.get(&project_id) {
            return existing.clone();
        }

        let manager = Arc::new(Mutex::new(FileListManager::new(
            self.store.clone(),
            self.audit.clone(),
            self.policy.clone(),
        )));
        if let Some((evicted, _)) = lists.push(project_id, manager.clone()) {
            if evicted != project_id {
                tracing::debug!(project_id = %evicted, "Files | list evicted");
            }
        }
        manager
    }

    /// Forget `project_id`'s manager. Holders of the old handle keep working;
    /// the next caller starts from the store again.
    pub async fn release_file_list(&self, project_id: Uuid) {
        self.lists.0.lock().await.pop(&project_id);
    }
}

/// One manager per project, least recently used evicted first. Each list is
/// mutated only under its own lock.
#[derive(Clone)]
pub struct FileLists(Arc<Mutex<LruCache<Uuid, Arc<Mutex<FileListManager>>>>>);

impl FileLists {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self(Arc::new(Mutex::new(LruCache::new(capacity))))
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}
