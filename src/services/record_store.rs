use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use uuid::Uuid;

use crate::entities::{file, profile, timeline_event};
use crate::models::audit::AuditEvent;
use crate::models::file_record::{FileRecord, FileSummary, NewFileRecord, UploaderProfile};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for file records and their audit trail.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Newest first, without payloads.
    async fn list_files(&self, project_id: Uuid) -> Result<Vec<FileSummary>, StoreError>;
    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError>;
    async fn insert_file(&self, record: NewFileRecord) -> Result<FileRecord, StoreError>;
    /// Must be idempotent on `event.id`.
    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError>;
    /// `StoreError::NotFound` when nothing was deleted.
    async fn delete_file(&self, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, FromQueryResult)]
struct FileSummaryRow {
    id: Uuid,
    project_id: Uuid,
    uploaded_by: Uuid,
    file_name: String,
    file_size: i64,
    file_type: String,
    created_at: chrono::NaiveDateTime,
    uploader_name: Option<String>,
}

impl From<FileSummaryRow> for FileSummary {
    fn from(row: FileSummaryRow) -> Self {
        Self {
            uploader: row.uploader_name.map(|full_name| UploaderProfile {
                id: row.uploaded_by,
                full_name,
            }),
            id: row.id,
            project_id: row.project_id,
            uploaded_by: row.uploaded_by,
            file_name: row.file_name,
            file_size: row.file_size,
            file_type: row.file_type,
            created_at: row.created_at,
        }
    }
}

/// Metadata columns plus the uploader name; `file_url` is never selected.
fn summary_query(project_id: Uuid) -> Select<file::Entity> {
    file::Entity::find()
        .select_only()
        .columns([
            file::Column::Id,
            file::Column::ProjectId,
            file::Column::UploadedBy,
            file::Column::FileName,
            file::Column::FileSize,
            file::Column::FileType,
            file::Column::CreatedAt,
        ])
        .column_as(profile::Column::FullName, "uploader_name")
        .join(JoinType::LeftJoin, file::Relation::Uploader.def())
        .filter(file::Column::ProjectId.eq(project_id))
        .order_by_desc(file::Column::CreatedAt)
}

pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn list_files(&self, project_id: Uuid) -> Result<Vec<FileSummary>, StoreError> {
        let rows = summary_query(project_id)
            .into_model::<FileSummaryRow>()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(FileSummary::from).collect())
    }

    async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        let row = file::Entity::find_by_id(id)
            .find_also_related(profile::Entity)
            .one(&self.db)
            .await?;

        Ok(row.map(|(model, uploader)| FileRecord::from_parts(model, uploader)))
    }

    async fn insert_file(&self, record: NewFileRecord) -> Result<FileRecord, StoreError> {
        let model = file::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(record.project_id),
            uploaded_by: Set(record.uploaded_by),
            file_name: Set(record.file_name),
            file_url: Set(record.file_url),
            file_size: Set(record.file_size),
            file_type: Set(record.file_type),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };

        let saved = model.insert(&self.db).await?;
        Ok(FileRecord::from_parts(saved, None))
    }

    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let model = timeline_event::ActiveModel {
            id: Set(event.id),
            project_id: Set(event.project_id),
            user_id: Set(event.user_id),
            event_type: Set(event.event_type.clone()),
            event_action: Set(event.event_action.clone()),
            event_data: Set(event.event_data.clone()),
            created_at: Set(event.created_at),
        };

        let result = timeline_event::Entity::insert(model)
            .on_conflict(
                OnConflict::column(timeline_event::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, id: Uuid) -> Result<(), StoreError> {
        let res = file::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
