
use crate::error::AppError;
use crate::models::file_record::RawFile;
use crate::utils::classifier::file_extension;
use crate::utils::media_type_essence;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const DEFAULT_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "webp", "txt", "md", "csv", "json", "docx",
];

const DEFAULT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
    "text/markdown",
    "text/csv",
    "application/json",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Server side upload gate. An empty allow-list admits nothing.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size: u64,
    /// Lowercase, without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Lowercase `type/subtype`, parameters excluded.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            allowed_mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UploadPolicy {
    /// Runs every check that must pass before the payload is encoded.
    pub fn check(&self, file: &RawFile) -> Result<(), AppError> {
        let actual = file.bytes.len() as u64;
        if file.declared_size > self.max_file_size {
            return Err(AppError::PayloadTooLarge {
                size: file.declared_size,
                limit: self.max_file_size,
            });
        }
        if actual > self.max_file_size {
            return Err(AppError::PayloadTooLarge {
                size: actual,
                limit: self.max_file_size,
            });
        }

        let ext = file_extension(&file.file_name).ok_or_else(|| {
            AppError::UnsupportedFileType(format!("'{}' has no extension", file.file_name))
        })?;
        if !self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            return Err(AppError::UnsupportedFileType(format!(
                "extension '.{}' is not allowed",
                ext
            )));
        }

        let mime = media_type_essence(&file.content_type);
        if !self.allowed_mime_types.iter().any(|allowed| *allowed == mime) {
            return Err(AppError::UnsupportedFileType(format!(
                "content type '{}' is not allowed",
                file.content_type
            )));
        }

        if file.declared_size != actual {
            return Err(AppError::SizeMismatch {
                declared: file.declared_size,
                actual,
            });
        }

        Ok(())
    }
}
