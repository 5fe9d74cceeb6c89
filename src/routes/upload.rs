use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::file_record::RawFile;
use crate::routes::files::FileResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/projects/{project_id}/files",
    tag = "Files",
    params(
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data",
        description = "A `file` part, plus an optional `file_size` part with the client-declared size"),
    responses(
        (status = 201, description = "File uploaded successfully", body = FileResponse),
        (status = 400, description = "Bad Request or declared size does not match"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "File exceeds the upload limit"),
        (status = 415, description = "File type not allowed"),
        (status = 500, description = "Upload failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let mut file: Option<RawFile> = None;
    let mut declared_size: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {}", e.body_text())))?
    {
        match field.name() {
            Some("file") => {
                if file.is_some() {
                    tracing::info!(%project_id, actor = %user.id, "Upload | POST files | res=400 | More than one file field");
                    return Err(AppError::BadRequest(
                        "Only one file field is allowed per upload".to_string(),
                    ));
                }
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e.body_text())))?;
                file = Some(RawFile::new(filename, content_type, data.to_vec()));
            }
            Some("file_size") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid file_size field".to_string()))?;
                let size = text
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| AppError::BadRequest("file_size must be a non-negative integer".to_string()))?;
                declared_size = Some(size);
            }
            _ => {}
        }
    }

    let Some(mut file) = file else {
        tracing::info!(%project_id, actor = %user.id, "Upload | POST files | res=400 | No file field found");
        return Err(AppError::BadRequest("No file field found".to_string()));
    };
    if let Some(size) = declared_size {
        file.declared_size = size;
    }

    let list = state.file_list(project_id).await;
    let record = list.lock().await.upload(project_id, user.id, file).await?;

    tracing::info!(%project_id, actor = %user.id, file = %record.file_name, "Upload | POST files | res=201");
    Ok((StatusCode::CREATED, Json(FileResponse::from(record))))
}
