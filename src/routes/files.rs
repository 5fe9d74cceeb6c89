use axum::{
    extract::{Path, State, Extension},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::file_record::{FileRecord, FileSummary};
use crate::services::preview::{PreviewController, PreviewView, RenderSurface};
use crate::state::AppState;
use crate::utils::classifier::{classify, FileCategory};
use crate::utils::payload::StoredPayload;
use crate::utils::{format_size, sanitize_filename};

#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub size_label: String,
    pub category: FileCategory,
    pub uploaded_by: Uuid,
    pub uploader_name: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub preview_url: String,
    pub download_url: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self::from(FileSummary::from(record))
    }
}

impl From<FileSummary> for FileResponse {
    fn from(record: FileSummary) -> Self {
        Self {
            size_label: format_size(record.file_size.max(0) as u64),
            category: classify(&record.file_name),
            uploader_name: record.uploader.map(|u| u.full_name),
            preview_url: format!("/files/{}/preview", record.id),
            download_url: format!("/files/{}/download", record.id),
            id: record.id,
            project_id: record.project_id,
            file_name: record.file_name,
            file_type: record.file_type,
            file_size: record.file_size,
            uploaded_by: record.uploaded_by,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ListFilesResponse {
    pub files: Vec<FileResponse>,
    /// True when the store could not be reached and the last loaded list is returned.
    pub stale: bool,
    pub error: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PreviewResponse {
    pub file: FileResponse,
    #[schema(value_type = Object)]
    pub view: PreviewView,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub id: Uuid,
}

/// Captures the view so it can be returned as JSON data.
#[derive(Default)]
struct JsonSurface {
    view: Option<PreviewView>,
}

impl RenderSurface for JsonSurface {
    fn render(&mut self, view: &PreviewView) {
        self.view = Some(view.clone());
    }

    fn clear(&mut self) {
        self.view = None;
    }
}

async fn find_file(state: &AppState, id: Uuid) -> Result<FileRecord, AppError> {
    state
        .store
        .get_file(id)
        .await
        .map_err(|e| AppError::FetchFailed(e.to_string()))?
        .ok_or(AppError::NotFound("File not found".into()))
}

// GET /projects/{project_id}/files
#[utoipa::path(
    get,
    path = "/projects/{project_id}/files",
    params(
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Files of the project, newest first", body = ListFilesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Store unavailable and nothing cached")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ListFilesResponse>, AppError> {
    let list = state.file_list(project_id).await;
    let mut files = list.lock().await;

    let loaded = files.load(project_id).await.map(|records| records.to_vec());
    let response = match loaded {
        Ok(records) => Ok(Json(ListFilesResponse {
            files: records.into_iter().map(FileResponse::from).collect(),
            stale: false,
            error: None,
        })),
        Err(e) if files.project_id() == Some(project_id) => {
            tracing::warn!(%project_id, error = %e, "Files | GET list | serving stale list");
            Ok(Json(ListFilesResponse {
                files: files.files().iter().cloned().map(FileResponse::from).collect(),
                stale: true,
                error: Some(e.to_string()),
            }))
        }
        Err(e) => Err(e),
    };

    // Nothing worth keeping; unknown or empty projects must not pile up.
    let idle = files.files().is_empty();
    drop(files);
    if idle {
        state.release_file_list(project_id).await;
    }

    response
}

// GET /files/{id}/preview
#[utoipa::path(
    get,
    path = "/files/{id}/preview",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Inert preview: literal text or an image source", body = PreviewResponse),
        (status = 404, description = "File not found"),
        (status = 422, description = "Stored payload could not be decoded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Files"
)]
pub async fn preview_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, AppError> {
    let record = find_file(&state, id).await?;

    let mut controller = PreviewController::new(state.codec());
    let mut surface = JsonSurface::default();
    controller.open(record.clone(), &mut surface).await?;

    let category = controller.session().map(|s| s.category);
    let view = surface
        .view
        .take()
        .ok_or_else(|| AppError::InternalServerError("Preview produced no view".to_string()))?;
    controller.close(&mut surface);

    tracing::info!(file_id = %id, file = %record.file_name, ?category, "Files | GET preview | res=200");
    Ok(Json(PreviewResponse {
        file: FileResponse::from(record),
        view,
    }))
}

// GET /files/{id}/download
#[utoipa::path(
    get,
    path = "/files/{id}/download",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Raw file bytes as an attachment", content_type = "application/octet-stream"),
        (status = 307, description = "Temporary redirect to the referenced content"),
        (status = 404, description = "File not found"),
        (status = 422, description = "Stored payload could not be decoded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = find_file(&state, id).await?;

    match StoredPayload::parse(&record.file_url)? {
        StoredPayload::Reference(url) => Ok(Redirect::temporary(url.as_str()).into_response()),
        StoredPayload::Inline(payload) => {
            let bytes = state.codec().decode(payload)?;
            let disposition = format!(
                "attachment; filename=\"{}\"",
                sanitize_filename(&record.file_name)
            );

            Ok((
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
                    (header::CONTENT_SECURITY_POLICY, "sandbox".to_string()),
                ],
                bytes,
            )
                .into_response())
        }
    }
}

// DELETE /files/{id}
#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted (or already absent)", body = DeleteResponse),
        (status = 403, description = "Caller is not the uploader"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let record = state
        .store
        .get_file(id)
        .await
        .map_err(|e| AppError::FetchFailed(e.to_string()))?;

    if let Some(record) = record {
        let list = state.file_list(record.project_id).await;
        list.lock().await.remove(id, user.id).await?;
    }

    tracing::info!(file_id = %id, actor = %user.id, "Files | DELETE | res=200");
    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
        id,
    }))
}
