use base64::{engine::general_purpose::STANDARD, Engine};
use url::Url;

use crate::error::AppError;
use crate::utils::media_type_essence;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// What a stored `file_url` holds.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredPayload<'a> {
    /// `data:<media-type>;base64,<body>`
    Inline(&'a str),
    /// Content kept elsewhere; only passed through, never decoded here.
    Reference(Url),
}

impl<'a> StoredPayload<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, AppError> {
        if raw.starts_with(DATA_PREFIX) {
            return Ok(StoredPayload::Inline(raw));
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(StoredPayload::Reference(url)),
            _ => Err(AppError::MalformedPayload(
                "payload is neither a data URI nor an http(s) reference".to_string(),
            )),
        }
    }
}

/// Converts raw bytes to the stored data URI form and back.
#[derive(Debug, Clone, Copy)]
pub struct PayloadCodec {
    max_bytes: u64,
}

impl PayloadCodec {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn encode(&self, data: &[u8], media_type: &str) -> Result<String, AppError> {
        let size = data.len() as u64;
        if size > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(format!(
            "{}{}{},{}",
            DATA_PREFIX,
            usable_media_type(media_type),
            BASE64_MARKER,
            STANDARD.encode(data)
        ))
    }

    pub fn decode(&self, payload: &str) -> Result<Vec<u8>, AppError> {
        let rest = payload.strip_prefix(DATA_PREFIX).ok_or_else(|| {
            AppError::MalformedPayload("missing data URI prefix".to_string())
        })?;
        let (meta, body) = rest
            .split_once(',')
            .ok_or_else(|| AppError::MalformedPayload("missing ',' separator".to_string()))?;
        if !meta.ends_with(BASE64_MARKER) {
            return Err(AppError::MalformedPayload(
                "only base64 data URIs are supported".to_string(),
            ));
        }

        STANDARD
            .decode(body)
            .map_err(|e| AppError::MalformedPayload(format!("invalid base64 body: {}", e)))
    }

    /// Decoded bytes as text. Invalid UTF-8 is replaced, never interpreted.
    pub fn decode_text(&self, payload: &str) -> Result<String, AppError> {
        let bytes = self.decode(payload)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// Parameters are dropped so the URI carries the same type the allow-list checked.
fn usable_media_type(media_type: &str) -> String {
    let essence = media_type_essence(media_type);
    let unusable = essence.is_empty()
        || essence
            .chars()
            .any(|c| c == ',' || c.is_whitespace() || c.is_control());
    if unusable {
        FALLBACK_MEDIA_TYPE.to_string()
    } else {
        essence
    }
}
