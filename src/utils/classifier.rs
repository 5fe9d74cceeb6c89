use std::path::Path;

use serde::Serialize;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

const TEXT_EXTENSIONS: &[&str] = &[
    // plain text and data
    "txt", "md", "markdown", "csv", "tsv", "log", "json", "xml", "yaml", "yml", "toml", "ini",
    "cfg", "conf", "env",
    // markup and source
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "html", "htm", "css", "scss", "sass", "less", "rs",
    "py", "rb", "go", "java", "kt", "c", "h", "cpp", "hpp", "cs", "php", "sh", "bash", "sql",
];

/// How a stored file is shown in a preview. Advisory only: nothing selects
/// interpretation of file content from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    RenderableText,
    Opaque,
}

/// Lowercased suffix of the final path component, if it has one.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

pub fn classify(file_name: &str) -> FileCategory {
    match file_extension(file_name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => FileCategory::Image,
        Some(ext) if TEXT_EXTENSIONS.contains(&ext.as_str()) => FileCategory::RenderableText,
        _ => FileCategory::Opaque,
    }
}
