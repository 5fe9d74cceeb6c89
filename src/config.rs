use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Context;

use crate::models::upload_policy::UploadPolicy;
use crate::services::audit::AuditRetry;
use crate::state::DEFAULT_FILE_LIST_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub upload_policy: UploadPolicy,
    pub audit_retry: AuditRetry,
    /// Project file lists kept loaded at once.
    pub file_list_capacity: NonZeroUsize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let mut upload_policy = UploadPolicy::default();
        if let Some(max) = parse_var::<u64>("MAX_UPLOAD_BYTES")? {
            upload_policy.max_file_size = max;
        }
        if let Ok(list) = env::var("ALLOWED_EXTENSIONS") {
            upload_policy.allowed_extensions = split_list(&list);
        }
        if let Ok(list) = env::var("ALLOWED_MIME_TYPES") {
            upload_policy.allowed_mime_types = split_list(&list);
        }

        let mut audit_retry = AuditRetry::default();
        if let Some(attempts) = parse_var::<u32>("AUDIT_RETRY_ATTEMPTS")? {
            audit_retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = parse_var::<u64>("AUDIT_RETRY_BACKOFF_MS")? {
            audit_retry.backoff = Duration::from_millis(ms);
        }

        let file_list_capacity = parse_var::<NonZeroUsize>("FILE_LIST_CACHE_SIZE")?
            .unwrap_or(DEFAULT_FILE_LIST_CAPACITY);

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            upload_policy,
            audit_retry,
            file_list_capacity,
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}

/// Comma separated, trimmed, lowercased, empties dropped. A leading dot is
/// tolerated so `.pdf` and `pdf` mean the same extension.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}
